use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use tagnav_audio::CommandDispatcher;
use tagnav_nav::feed::TransformFeed;
use tagnav_nav::{Directive, NavEngine, TransformObserver};
use tagnav_proto::{Command, Observation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    Complete,
    Interrupted,
}

/// Steps the engine once and carries out its directives in order.
/// Returns true once `complete` has been said.
pub async fn tick(
    nav: &mut NavEngine,
    obs: Option<&Observation>,
    dispatcher: &mut dyn CommandDispatcher,
) -> Result<bool> {
    let out = nav.step(obs).context("navigation halted")?;
    for directive in &out.directives {
        match directive {
            Directive::Say(cmd) => {
                debug!("run: say {}", cmd);
                if let Err(e) = dispatcher.dispatch(*cmd) {
                    warn!("audio dispatch failed: {:#}", e);
                }
            }
            // Blind: nothing is read until the dwell ends.
            Directive::Dwell(d) => tokio::time::sleep(*d).await,
        }
    }
    Ok(out.halted())
}

/// Periodic tick loop. Ticks never overlap; `shutdown` is checked between
/// ticks only, so a signal that lands during a dwell is acted on right after it.
pub async fn drive<S, F>(
    nav: &mut NavEngine,
    mut observe: S,
    dispatcher: &mut dyn CommandDispatcher,
    interval: Duration,
    shutdown: F,
) -> Result<Finish>
where
    S: FnMut() -> Option<Observation>,
    F: Future<Output = ()>,
{
    // Delay: a late tick (after a descent dwell) never fires twice in a row.
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                warn!("run: interrupted before completion");
                return Ok(Finish::Interrupted);
            }
            _ = ticker.tick() => {}
        }

        let obs = observe();
        match tick(nav, obs.as_ref(), dispatcher).await {
            Ok(true) => {
                info!("run: navigation complete");
                return Ok(Finish::Complete);
            }
            Ok(false) => {}
            Err(e) => {
                error!("run: {:#}", e);
                return Err(e);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOutcome {
    pub commands: Vec<Command>,
    pub completed: bool,
}

/// One recorded batch per tick, dwell skipped. Once the input runs out the
/// last observation stays in place.
pub async fn replay(
    nav: &mut NavEngine,
    mut source: Option<TransformFeed>,
    max_ticks: usize,
) -> Result<ReplayOutcome> {
    let observer = TransformObserver::new();
    let mut commands = Vec::new();

    for n in 0..max_ticks {
        if let Some(feed) = source.as_mut() {
            match feed.next_batch().await? {
                Some(batch) => {
                    observer.publish(batch.into_observations(time::OffsetDateTime::now_utc()))
                }
                None => {
                    debug!("replay: input exhausted at tick {}", n);
                    source = None;
                }
            }
        }

        let out = nav
            .step(observer.current().as_ref())
            .with_context(|| format!("replay tick {}", n))?;
        commands.extend(out.commands());
        if out.halted() {
            return Ok(ReplayOutcome { commands, completed: true });
        }
    }

    warn!("replay: stopped after {} ticks in {:?}", max_ticks, nav.session().state());
    Ok(ReplayOutcome { commands, completed: false })
}
