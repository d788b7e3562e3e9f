//! Orchestrator-level integration tests over the library API, driving the
//! full run with scripted collaborators instead of live provider systems.

use std::path::Path;
use std::sync::Arc;

use credforge::config::{OutputFormat, Provider, ProvisioningRequest};
use credforge::setup::graph::{GraphApi, MockGraphApi};
use credforge::setup::interaction::mock::MockInteraction;
use credforge::setup::interaction::UserInteraction;
use credforge::setup::output::parse_env_credentials;
use credforge::setup::workflow::WorkflowContext;
use credforge::setup::SetupOrchestrator;
use credforge::subprocess::{MockProcessRunner, SubprocessManager};

fn request(providers: Vec<Provider>, dir: &Path, dry_run: bool) -> ProvisioningRequest {
    ProvisioningRequest {
        project_name: "Demo Shop".to_string(),
        domain: "demo.example.com".to_string(),
        providers,
        dry_run,
        interactive: false,
        force: true,
        verbose: false,
        format: OutputFormat::Env,
        output_path: Some(dir.join(".env.oauth")),
    }
}

fn orchestrator(graph: Arc<MockGraphApi>) -> (SetupOrchestrator, MockProcessRunner, Arc<MockGraphApi>) {
    let (subprocess, mock) = SubprocessManager::mock();
    let ctx = WorkflowContext {
        subprocess,
        graph: Arc::clone(&graph) as Arc<dyn GraphApi>,
        interaction: Arc::new(MockInteraction::new()) as Arc<dyn UserInteraction>,
    };
    (SetupOrchestrator::new(ctx), mock, graph)
}

#[tokio::test]
async fn dry_run_never_reaches_a_process_or_the_network() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, process_mock, graph_mock) = orchestrator(Arc::new(MockGraphApi::new()));

    let run = orchestrator
        .run(&request(Provider::ALL.to_vec(), dir.path(), true))
        .await
        .unwrap();

    assert_eq!(process_mock.invocation_count(), 0);
    assert_eq!(graph_mock.calls(), 0);

    assert_eq!(run.setup_results.len(), 4);
    for result in &run.setup_results {
        let credentials = result
            .credentials
            .as_ref()
            .unwrap_or_else(|| panic!("{} should have synthesized credentials", result.provider));
        assert!(!credentials.fields.is_empty());
        for value in credentials.fields.values() {
            assert!(value.ends_with(".dry-run"), "synthesized value: {value}");
        }
    }
    assert!(run.all_provisioned());
}

#[tokio::test]
async fn dry_run_results_arrive_in_fixed_provider_order() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, _process, _graph) = orchestrator(Arc::new(MockGraphApi::new()));

    // Request them deliberately shuffled
    let run = orchestrator
        .run(&request(
            vec![
                Provider::MobilePlatform,
                Provider::CloudOauth,
                Provider::DirectoryTenant,
                Provider::SocialGraph,
            ],
            dir.path(),
            true,
        ))
        .await
        .unwrap();

    let order: Vec<Provider> = run.setup_results.iter().map(|r| r.provider).collect();
    assert_eq!(order, Provider::ALL.to_vec());
}

#[tokio::test]
async fn written_env_file_round_trips_through_the_parser() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, _process, _graph) =
        orchestrator(Arc::new(MockGraphApi::authenticated("Dev")));

    let run = orchestrator
        .run(&request(vec![Provider::SocialGraph], dir.path(), false))
        .await
        .unwrap();

    let written = std::fs::read_to_string(&run.output_file).unwrap();
    let parsed = parse_env_credentials(&written);
    assert_eq!(parsed.len(), 1);

    let original = run.setup_results[0].credentials.as_ref().unwrap();
    assert_eq!(&parsed[0], original);
}

#[tokio::test]
async fn repeated_writes_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();

    let mut contents = Vec::new();
    for _ in 0..2 {
        let (orchestrator, _process, _graph) =
            orchestrator(Arc::new(MockGraphApi::authenticated("Dev")));
        let run = orchestrator
            .run(&request(
                vec![Provider::SocialGraph, Provider::MobilePlatform],
                dir.path(),
                false,
            ))
            .await
            .unwrap();
        contents.push(std::fs::read(&run.output_file).unwrap());
    }
    assert_eq!(contents[0], contents[1]);
}

#[tokio::test]
async fn manual_only_provider_is_reported_not_failed() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, process_mock, _graph) = orchestrator(Arc::new(MockGraphApi::new()));

    let run = orchestrator
        .run(&request(vec![Provider::MobilePlatform], dir.path(), false))
        .await
        .unwrap();

    assert_eq!(process_mock.invocation_count(), 0);
    let mobile = &run.setup_results[0];
    assert!(mobile.credentials.is_none());
    assert!(mobile.needs_manual_setup());
    assert!(!run.all_provisioned());

    // The credential file still materializes, without mobile entries
    let written = std::fs::read_to_string(&run.output_file).unwrap();
    assert!(!written.contains("MOBILE_PLATFORM"));
}
