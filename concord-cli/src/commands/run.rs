//! Execute a scenario against a fresh application.

use super::load_config;
use crate::scenario::{Memory, Scenario, Step};
use anyhow::{Context, Result};
use concord_concepts::App;
use concord_engine::{Record, Value};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct RequestLine<'a> {
    step: usize,
    path: &'a str,
    request: &'a Value,
    responses: &'a [Record],
}

pub async fn run_scenario(config_path: &Path, scenario_path: &Path, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let scenario = Scenario::from_file(scenario_path)?;
    let app = App::new(config).context("Failed to build application")?;
    let mut memory = Memory::default();

    for (index, step) in scenario.steps.iter().enumerate() {
        let number = index + 1;
        match step {
            Step::Register(username) => {
                app.register(username)
                    .await
                    .with_context(|| format!("step {number}: register {username}"))?;
                if !json {
                    println!("[{number}] registered {username}");
                }
            }
            Step::Login(username) => {
                let session = app
                    .login(username)
                    .await
                    .with_context(|| format!("step {number}: login {username}"))?;
                memory.remember_session(username, session);
                if !json {
                    println!("[{number}] {username} logged in");
                }
            }
            Step::Request(request) => {
                let fields = memory
                    .request_fields(request)
                    .with_context(|| format!("step {number}: {}", request.path))?;
                let response = app
                    .request(fields)
                    .await
                    .with_context(|| format!("step {number}: {}", request.path))?;

                for (name, field) in &request.save {
                    let value = response
                        .responses
                        .first()
                        .and_then(|first| first.get(field))
                        .with_context(|| {
                            format!("step {number}: no `{field}` in the response to save as `${name}`")
                        })?;
                    memory.save(name, value.clone());
                }

                if json {
                    let line = RequestLine {
                        step: number,
                        path: &request.path,
                        request: &response.request,
                        responses: &response.responses,
                    };
                    println!("{}", serde_json::to_string(&line)?);
                } else {
                    print_responses(number, &request.path, &response.responses);
                }
            }
        }
    }

    let stats = app.engine().stats();
    tracing::info!(
        occurrences = stats.occurrences,
        flows = stats.flows,
        firings = stats.firings,
        "scenario complete"
    );
    if !json {
        println!(
            "{} occurrences across {} flows, {} firings, {} fallbacks",
            stats.occurrences, stats.flows, stats.firings, stats.fallbacks
        );
    }
    Ok(())
}

fn print_responses(number: usize, path: &str, responses: &[Record]) {
    match responses.len() {
        0 => println!("[{number}] {path}: no response"),
        1 => println!("[{number}] {path}: 1 response"),
        n => println!("[{number}] {path}: {n} responses"),
    }
    for response in responses {
        println!("    {}", Value::Record(response.clone()));
    }
}
