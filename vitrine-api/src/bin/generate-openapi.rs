//! OpenAPI Specification Generator Binary
//!
//! Prints the VITRINE OpenAPI specification as JSON to stdout.
//!
//! Usage:
//!   cargo run -p vitrine-api --bin generate-openapi > openapi.json

use vitrine_api::ApiDoc;

fn main() {
    match ApiDoc::to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI spec: {}", e);
            std::process::exit(1);
        }
    }
}
