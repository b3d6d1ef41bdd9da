//! Running the pipeline task by task against in-memory services.

mod common;

use common::{fake_services, EtlCheckout, FakeNotebook};
use notebook_etl::client::Row;
use notebook_etl::step_handlers::TaskOutcome;
use notebook_etl::workflow::{run_task, DefaultArgs, WorkflowBuilder};
use serde_json::json;

#[tokio::test]
async fn test_full_run_in_task_order() {
    let checkout = EtlCheckout::new()
        .notebook("JHU")
        .script("JHU_views.sql", "CREATE VIEW {{ database }}.PUBLIC.V AS SELECT 1;")
        .qa_script("JHU", "SELECT * FROM QA_NEGATIVE_CASES;")
        .with_git_credentials()
        .var("S3_BUCKET", "covid-output")
        .var("SNOWFLAKE_STAGE", "COVID_DEV");
    checkout.write("output/JHU-stale.csv", "old");
    let config = checkout.config();
    let workflow = WorkflowBuilder::new(config.clone())
        .build("JHU", &config.schedules, DefaultArgs::for_basename("JHU"))
        .unwrap();

    let failing = Row::from_pairs([
        ("TABLE_NAME", json!("JHU_COVID_19")),
        ("ERROR_DESC", json!("negative cases")),
        ("ERROR_COUNT", json!("4")),
        ("ERROR_CONDITION", json!("CASES < 0")),
    ]);
    let notebook = FakeNotebook {
        produces: vec!["JHU.csv".to_string(), "JHU-states.csv".to_string()],
    };
    let (services, fakes) = fake_services(config, notebook, vec![failing]);

    let mut outcomes = Vec::new();
    for task_id in workflow.task_ids() {
        outcomes.push(run_task(&workflow, task_id, &services).await.unwrap());
    }

    assert_eq!(
        outcomes,
        vec![
            TaskOutcome::Marker,
            TaskOutcome::FilesRemoved { count: 1 },
            TaskOutcome::NotebookExecuted,
            TaskOutcome::Uploaded { files: 2, last_result: true },
            TaskOutcome::StatementsExecuted { count: 5 },
            TaskOutcome::StatementsExecuted { count: 2 },
            TaskOutcome::QualityChecked { failures: 1, issues_filed: 1 },
            TaskOutcome::Marker,
        ]
    );
    assert_eq!(*fakes.storage.keys.lock().unwrap(), vec!["JHU-states.csv", "JHU.csv"]);

    let batches = fakes.warehouse.batches.lock().unwrap();
    let load = batches[0].statements();
    assert_eq!(load[0], "TRUNCATE TABLE JHU_states");
    assert_eq!(load[2], "TRUNCATE TABLE JHU");
    assert_eq!(load.last().map(String::as_str), Some("COMMIT"));
    assert_eq!(
        batches[1].statements(),
        ["CREATE VIEW COVID19.PUBLIC.V AS SELECT 1", "COMMIT"]
    );
    assert_eq!(*fakes.tracker.titles.lock().unwrap(), vec!["QA Failed for JHU_COVID_19"]);
}

#[tokio::test]
async fn test_cleanup_twice_is_harmless() {
    let checkout = EtlCheckout::new().notebook("JHU");
    checkout.write("output/JHU.csv", "x");
    let config = checkout.config();
    let workflow = WorkflowBuilder::new(config.clone())
        .build("JHU", &config.schedules, DefaultArgs::for_basename("JHU"))
        .unwrap();
    let (services, _) = fake_services(config, FakeNotebook::default(), Vec::new());

    assert_eq!(
        run_task(&workflow, "cleanup", &services).await.unwrap(),
        TaskOutcome::FilesRemoved { count: 1 }
    );
    assert_eq!(
        run_task(&workflow, "cleanup", &services).await.unwrap(),
        TaskOutcome::FilesRemoved { count: 0 }
    );
}

#[tokio::test]
async fn test_upload_without_bucket_fails() {
    let checkout = EtlCheckout::new().notebook("JHU");
    let config = checkout.config();
    let workflow = WorkflowBuilder::new(config.clone())
        .build("JHU", &config.schedules, DefaultArgs::for_basename("JHU"))
        .unwrap();
    let (services, _) = fake_services(config, FakeNotebook::default(), Vec::new());

    let err = run_task(&workflow, "upload_to_s3", &services).await.unwrap_err();
    assert!(err.to_string().contains("S3_BUCKET"));
}
