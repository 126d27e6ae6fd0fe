use clap::{CommandFactory, FromArgMatches, Parser};
use std::io::Write;
use tactile_recon::acquisition::DEFAULT_CHANNEL_MAP;
use tactile_recon::config::{parse_f64_array, Config, SensorParams};
use tactile_recon::ReconError;
use tempfile::NamedTempFile;

#[derive(Parser, Debug)]
struct TestCli {
    #[command(flatten)]
    config: Config,
}

fn parse_cli(args: &[&str]) -> (Config, clap::ArgMatches) {
    let mut argv = vec!["tactile"];
    argv.extend_from_slice(args);
    let matches = TestCli::command().get_matches_from(argv);
    let cli = TestCli::from_arg_matches(&matches).unwrap();
    (cli.config, matches)
}

#[test]
fn test_cli_defaults_match_serde_defaults() {
    let (cli, _) = parse_cli(&[]);
    let from_json: Config = serde_json::from_str("{}").unwrap();

    assert_eq!(cli.sensor.rows, from_json.sensor.rows);
    assert_eq!(cli.sensor.threshold, from_json.sensor.threshold);
    assert_eq!(cli.cloud.lognormal_cov, from_json.cloud.lognormal_cov);
    assert_eq!(cli.cloud.min_points, 20);
    assert_eq!(cli.mixture.tol, from_json.mixture.tol);
    assert_eq!(cli.mixture.force_coefficient, 0.575);
    assert_eq!(cli.cloud.sample_seed, None);
}

#[test]
fn test_partial_json_keeps_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ "cloud": {{ "scale_factor": 250.0 }}, "mixture": {{ "n_init": 3 }} }}"#).unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    assert_eq!(config.cloud.scale_factor, 250.0);
    assert_eq!(config.cloud.spacing, 10.0);
    assert_eq!(config.mixture.n_init, 3);
    assert_eq!(config.sensor.cols, 8);
}

#[test]
fn test_missing_file_is_config_error() {
    let res = Config::load_from_file("/definitely/not/here.json");
    assert!(matches!(res, Err(ReconError::Config(_))));
}

#[test]
fn test_bad_json_is_json_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{{ not json").unwrap();
    assert!(matches!(Config::load_from_file(file.path()), Err(ReconError::Json(_))));
}

#[test]
fn test_merge_only_applies_typed_flags() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ "cloud": {{ "scale_factor": 250.0, "min_points": 5 }} }}"#).unwrap();
    let mut config = Config::load_from_file(file.path()).unwrap();

    let (cli, matches) = parse_cli(&["--min-points", "40", "--sample-seed", "7"]);
    config.merge_from_cli(&cli, &matches);

    // Typed on the command line.
    assert_eq!(config.cloud.min_points, 40);
    assert_eq!(config.cloud.sample_seed, Some(7));
    // From the file, not clobbered by the clap default of 100.
    assert_eq!(config.cloud.scale_factor, 250.0);
}

#[test]
fn test_parse_f64_array() {
    assert_eq!(parse_f64_array::<2>(" 1.5, -2", "lognormal_mean").unwrap(), [1.5, -2.0]);
    assert!(matches!(
        parse_f64_array::<4>("1,2,3", "lognormal_cov"),
        Err(ReconError::Config(_))
    ));
    assert!(parse_f64_array::<2>("1,x", "lognormal_mean").is_err());
}

#[test]
fn test_accessors_build_core_values() {
    let config = Config::default();
    let cloud = config.cloud.cloud_options().unwrap();
    assert_eq!(cloud.shape.cov(), [[0.5, 0.0], [0.0, 0.5]]);
    assert_eq!(cloud.min_points, 20);

    let fit = config.mixture.fit_options();
    assert_eq!(fit.max_iter, 100);
    assert_eq!(fit.reg_covar, 1e-6);
    assert_eq!(fit.seed, 0);
}

#[test]
fn test_non_positive_definite_cov_rejected() {
    let mut config = Config::default();
    config.cloud.lognormal_cov = "1.0,2.0,2.0,1.0".to_string();
    assert!(matches!(
        config.cloud.cloud_options(),
        Err(ReconError::InvalidInput {
            argument: "lognormal_cov",
            ..
        })
    ));
}

#[test]
fn test_channel_map_variants() {
    let mut sensor = SensorParams::default();
    assert_eq!(sensor.get_channel_map().unwrap(), None);

    sensor.channel_map = Some("deployed".to_string());
    assert_eq!(sensor.get_channel_map().unwrap(), Some(DEFAULT_CHANNEL_MAP.to_vec()));

    sensor.channel_map = Some("0,1,2".to_string());
    assert!(sensor.get_channel_map().is_err());

    sensor.rows = 1;
    sensor.cols = 3;
    sensor.channel_map = Some("0,0,2".to_string());
    assert!(sensor.get_channel_map().is_err());
}
