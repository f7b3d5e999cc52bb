//! Unit tests for CLI commands

use crate::cli::{execute, format_route_table, Cli, Commands};
use crate::dispatcher::{Controllers, HandlerResponse};
use crate::server::{AppService, RouterOptions};
use crate::spec::load_spec_str;
use clap::Parser;
use std::io::Write;

const PETS: &str = r#"
swagger: "2.0"
basePath: /v1
paths:
  /pets:
    get:
      operationId: listPets
  /pets/{petId}:
    get:
      operationId: showPetById
      parameters:
        - in: path
          name: petId
          required: true
          type: string
"#;

#[test]
fn test_check_command_parses() {
    let cli = Cli::try_parse_from(["specrouter", "check", "--spec", "pets.yaml"]).unwrap();
    match cli.command {
        Commands::Check { spec } => assert_eq!(spec.to_string_lossy(), "pets.yaml"),
        Commands::Serve { .. } => panic!("Expected Check command"),
    }
}

#[test]
fn test_serve_command_default_addr() {
    let cli = Cli::try_parse_from(["specrouter", "serve", "-s", "pets.yaml"]).unwrap();
    match cli.command {
        Commands::Serve { addr, .. } => assert_eq!(addr, "0.0.0.0:8080"),
        Commands::Check { .. } => panic!("Expected Serve command"),
    }
}

#[test]
fn test_spec_is_required() {
    assert!(Cli::try_parse_from(["specrouter", "check"]).is_err());
}

#[test]
fn test_route_table_includes_base_path() {
    let doc = load_spec_str(PETS).unwrap();
    let controllers = Controllers::new()
        .with_sync("listPets", |_req| Ok(HandlerResponse::no_content()))
        .with_sync("showPetById", |_req| Ok(HandlerResponse::no_content()));
    let service = AppService::build(&doc, &controllers, RouterOptions::default()).unwrap();
    let table = format_route_table(&service);
    assert!(table.contains("GET     /v1/pets  listPets"), "{table}");
    assert!(table.contains("/v1/pets/{petId}  showPetById"), "{table}");
}

#[test]
fn test_check_valid_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(PETS.as_bytes()).unwrap();
    let cli = Cli::try_parse_from([
        "specrouter",
        "check",
        "--spec",
        file.path().to_str().unwrap(),
    ])
    .unwrap();
    assert!(execute(cli).is_ok());
}

#[test]
fn test_check_invalid_file_fails() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"swagger: \"1.2\"\npaths:\n  pets: {}\n").unwrap();
    let cli = Cli::try_parse_from([
        "specrouter",
        "check",
        "--spec",
        file.path().to_str().unwrap(),
    ])
    .unwrap();
    let err = execute(cli).unwrap_err();
    assert!(format!("{err:#}").contains("structural validation"), "{err:#}");
}
