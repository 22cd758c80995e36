use std::fs;
use std::path::PathBuf;

use approx::assert_abs_diff_eq;

use sat_pointer::predict::{
    compute_sky_path, find_next_pass, load_tle_file, topocentric, ObserverFrame, PredictError,
    Satellite, SKY_PATH_POINTS,
};
use sat_pointer::time::SECONDS_PER_DAY;

const ISS_L1: &str = "1 25544U 98067A   25278.49802050  .00011384  00000+0  20935-3 0  9990";
const ISS_L2: &str = "2 25544  51.6327 120.3420 0000884 206.2421 153.8523 15.49697304532279";
const GEO_L1: &str = "1 99999U 98067A   25278.50000000  .00000000  00000+0  00000+0 0  9992";
const GEO_L2: &str = "2 99999   0.0100   0.0000 0001000   0.0000   0.0000  1.00270000    10";

fn write_elements(file: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{}-{}", std::process::id(), file));
    fs::write(&path, content).unwrap();
    path
}

fn paris() -> ObserverFrame {
    ObserverFrame::new(48.8566, 2.3522, 35.0)
}

#[test]
fn element_file_skips_bad_sets() {
    let corrupt = ISS_L2.replace("51.6327", "51.6328");
    let content = format!(
        "ISS (ZARYA)\n{ISS_L1}\n{ISS_L2}\n\nstray text\nBROKEN\n{ISS_L1}\n{corrupt}\n{GEO_L1}\n{GEO_L2}\n"
    );
    let path = write_elements("mixed.tle", &content);
    let sets = load_tle_file(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].0.name, "ISS (ZARYA)");
    assert_eq!(sets[0].1.catalog_number, 25544);
    assert_eq!(sets[1].0.name, "");
    assert_eq!(sets[1].1.catalog_number, 99999);
}

#[test]
fn missing_element_file_is_an_error() {
    let path = std::env::temp_dir().join("no-such-dir-for-elements").join("none.tle");
    assert!(matches!(load_tle_file(&path), Err(PredictError::FileRead(_))));
}

#[test]
fn consecutive_passes_follow_each_other() {
    let path = write_elements("iss.tle", &format!("ISS\n{ISS_L1}\n{ISS_L2}\n"));
    let mut sets = load_tle_file(&path).unwrap();
    fs::remove_file(&path).unwrap();
    let (_, elements) = sets.remove(0);
    let sat = Satellite::new(elements);
    let observer = paris();

    let first = find_next_pass(&sat, &observer, sat.elements().epoch).unwrap();
    let first_set = first.set.unwrap();

    // searching again once the satellite is well down gives the following pass
    let later = first_set.time.plus_seconds(600);
    let second = find_next_pass(&sat, &observer, later).unwrap();
    let (rise, set) = (second.rise.unwrap(), second.set.unwrap());
    assert!(!second.is_up());
    assert!((rise.time - first_set.time) * SECONDS_PER_DAY > 3600.0);
    assert!((set.time - rise.time) * SECONDS_PER_DAY < 15.0 * 60.0);
    if let Some(transit) = second.transit {
        assert!(rise.time < transit.time && transit.time < set.time);
    }

    let here = topocentric(&sat.predict(later).unwrap(), &observer);
    assert!(here.elevation_deg < -1.0);
    let path = compute_sky_path(&sat, &observer, later, here.elevation_deg, &second).unwrap();
    assert_eq!(path.len(), SKY_PATH_POINTS);
    assert_abs_diff_eq!(path[0].azimuth_deg, rise.azimuth_deg, epsilon = 1e-9);
    assert!(path.iter().all(|p| p.elevation_deg > -1.0));
}
