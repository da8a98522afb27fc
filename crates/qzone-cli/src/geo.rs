use qzone_core::{distance_meters, gcj02_to_wgs84, is_outside_china, wgs84_to_gcj02};

use crate::Datum;

pub(crate) fn run_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) {
    println!("{} m", distance_meters(lat1, lng1, lat2, lng2));
}

pub(crate) fn run_convert(lat: f64, lng: f64, direction: Datum) {
    if is_outside_china(lat, lng) {
        println!("note: ({lat}, {lng}) is outside China; coordinate unchanged");
    }
    let converted = match direction {
        Datum::Wgs84ToGcj02 => wgs84_to_gcj02(lat, lng),
        Datum::Gcj02ToWgs84 => gcj02_to_wgs84(lat, lng),
    };
    println!("{:.6}, {:.6}", converted.latitude, converted.longitude);
}
