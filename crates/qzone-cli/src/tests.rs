use clap::Parser;

use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["qzone"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["qzone", "db", "migrate"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn nearby_defaults_to_device_position_online() {
    let cli = Cli::try_parse_from(["qzone", "nearby"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Nearby {
            radius: None,
            lat: None,
            lng: None,
            offline: false
        })
    ));
}

#[test]
fn nearby_accepts_negative_coordinates() {
    let cli = Cli::try_parse_from([
        "qzone", "nearby", "--lat", "-33.86", "--lng", "151.2", "--radius", "800",
    ])
    .unwrap();
    let Some(Commands::Nearby {
        radius, lat, lng, ..
    }) = cli.command
    else {
        panic!("expected nearby command");
    };
    assert_eq!(lat, Some(-33.86));
    assert_eq!(lng, Some(151.2));
    assert_eq!(radius, Some(800.0));
}

#[test]
fn nearby_latitude_requires_longitude() {
    assert!(Cli::try_parse_from(["qzone", "nearby", "--lat", "31.2"]).is_err());
}

#[test]
fn answer_requires_at_least_one_token() {
    assert!(Cli::try_parse_from(["qzone", "answer", "survey-1", "q-1"]).is_err());

    let cli = Cli::try_parse_from(["qzone", "answer", "survey-1", "q-1", "A", "C"]).unwrap();
    let Some(Commands::Answer { answers, .. }) = cli.command else {
        panic!("expected answer command");
    };
    assert_eq!(answers, vec!["A".to_string(), "C".to_string()]);
}

#[test]
fn distance_takes_negative_positionals() {
    let cli = Cli::try_parse_from(["qzone", "distance", "52.52", "13.405", "-48.85", "-2.35"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Distance { lat2, lng2, .. }) if lat2 < 0.0 && lng2 < 0.0
    ));
}

#[test]
fn convert_direction_defaults_to_wgs84_to_gcj02() {
    let cli = Cli::try_parse_from(["qzone", "convert", "31.23", "121.47"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Convert {
            direction: Datum::Wgs84ToGcj02,
            ..
        })
    ));

    let cli = Cli::try_parse_from([
        "qzone",
        "convert",
        "31.23",
        "121.47",
        "--direction",
        "gcj02-to-wgs84",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Convert {
            direction: Datum::Gcj02ToWgs84,
            ..
        })
    ));
}

#[test]
fn login_token_is_required() {
    // Guard against an ambient token leaking into the test.
    if std::env::var_os("QZONE_THIRD_PARTY_TOKEN").is_none() {
        assert!(Cli::try_parse_from(["qzone", "login"]).is_err());
    }
    let cli = Cli::try_parse_from(["qzone", "login", "--token", "abc"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Login { ref token }) if token == "abc"));
}
