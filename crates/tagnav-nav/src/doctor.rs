use anyhow::Result;
use std::time::Duration;

use crate::{MarkerCalibration, NavParams, WaypointTable};

pub fn check_params(params: &NavParams, tick_interval: Duration) -> Result<()> {
    params.validate()?;
    anyhow::ensure!(
        params.align_tolerance_m < 1.0,
        "nav.align_tolerance_m looks like centimeters, expected meters"
    );
    anyhow::ensure!(!tick_interval.is_zero(), "nav.tick_interval_s must be > 0");
    Ok(())
}

pub fn check_route(table: &WaypointTable, destinations: &[String]) -> Result<()> {
    anyhow::ensure!(!table.is_empty(), "waypoint table is empty");
    anyhow::ensure!(!destinations.is_empty(), "nav.destinations is empty");
    table.resolve(destinations)?;
    Ok(())
}

pub fn check_calibration(calibration: &MarkerCalibration) -> Result<()> {
    anyhow::ensure!(!calibration.is_empty(), "marker calibration is empty");
    for id in calibration.marker_ids() {
        anyhow::ensure!(!id.trim().is_empty(), "blank marker id in calibration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::default_marker_table;
    use crate::waypoints::{default_destinations, default_waypoint_table};

    #[test]
    fn test_defaults_pass() {
        let table = WaypointTable::from_table(&default_waypoint_table());
        check_route(&table, &default_destinations()).unwrap();
        check_params(&NavParams::default(), Duration::from_secs(2)).unwrap();
        let calibration = MarkerCalibration::from_table(&default_marker_table()).unwrap();
        check_calibration(&calibration).unwrap();
    }

    #[test]
    fn test_unknown_destination_fails() {
        let table = WaypointTable::from_table(&default_waypoint_table());
        let err = check_route(&table, &["A".to_string(), "Q".to_string()]).unwrap_err();
        assert!(format!("{:#}", err).contains("\"Q\""));
    }

    #[test]
    fn test_negative_ascend_threshold_fails() {
        let params = NavParams { ascend_threshold_m: -0.05, ..NavParams::default() };
        assert!(check_params(&params, Duration::from_secs(2)).is_err());
    }

    #[test]
    fn test_zero_tick_fails() {
        assert!(check_params(&NavParams::default(), Duration::ZERO).is_err());
    }
}
