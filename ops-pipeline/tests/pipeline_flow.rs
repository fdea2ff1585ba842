use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ops_adapters::gateway::{BackendGateway, ModelGateway};
use ops_adapters::traits::{
    AdapterError, AdapterMetadata, AdapterResult, CompletionRequest, ModelBackend,
};
use ops_pipeline::{Executor, Pipeline, Planner, Verifier};
use ops_primitives::{ExecutionPlan, ExecutionStep, ObjectSchema, RunStatus};
use ops_tools::{FnTool, Tool, ToolError, ToolOutcome, ToolRegistry};
use serde_json::{Map, Value, json};

/// Backend that replays canned replies and then reports itself unreachable.
struct ScriptedBackend {
    metadata: AdapterMetadata,
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new<I>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        Arc::new(Self {
            metadata: AdapterMetadata::new("scripted", "scripted-model"),
            replies: Mutex::new(replies.into_iter().map(|reply| reply.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn complete(&self, _request: CompletionRequest) -> AdapterResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .map(|reply| format!("```json\n{reply}\n```"))
            .ok_or_else(|| AdapterError::transport("backend unreachable"))
    }
}

fn gateway(backend: &Arc<ScriptedBackend>) -> Arc<dyn ModelGateway> {
    Arc::new(BackendGateway::new(Arc::clone(backend) as Arc<dyn ModelBackend>))
}

/// `get_weather` stand-in: knows Paris and Oslo, reports every other city missing.
fn weather_stub(calls: Arc<AtomicUsize>) -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "get_weather",
        "Get current weather information for a city",
        ObjectSchema::new("WeatherParams"),
        move |params: Map<String, Value>| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let city = params.get("city").and_then(Value::as_str).unwrap_or_default();
                Ok(match city {
                    "Paris" | "Oslo" => ToolOutcome::Success(json!({
                        "city": city,
                        "temperature": 18.5,
                        "conditions": "clear sky",
                        "units": "°C"
                    })),
                    other => ToolOutcome::failure(format!("City '{other}' not found")),
                })
            }
        },
    ))
}

fn raising_tool(name: &str, calls: Arc<AtomicUsize>) -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        name,
        "Always raises",
        ObjectSchema::new("NoParams"),
        move |_params: Map<String, Value>| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<ToolOutcome, _>(ToolError::execution("connection reset by peer"))
            }
        },
    ))
}

fn flaky_tool(name: &str, calls: Arc<AtomicUsize>) -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        name,
        "Reports a transient upstream failure",
        ObjectSchema::new("NoParams"),
        move |_params: Map<String, Value>| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(ToolOutcome::failure("News API request failed: 503 Service Unavailable"))
            }
        },
    ))
}

fn registry(tools: Vec<Arc<dyn Tool>>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool).unwrap();
    }
    Arc::new(registry)
}

fn weather_step(number: u32, city: &str) -> Value {
    json!({
        "step_number": number,
        "tool_name": "get_weather",
        "parameters": { "city": city },
        "description": format!("Get the weather in {city}")
    })
}

fn plan_reply(steps: Vec<Value>) -> Value {
    json!({
        "task_summary": "Report the weather",
        "steps": steps,
        "expected_output": "Current conditions for each city"
    })
}

fn single_step_plan(tool: &str) -> ExecutionPlan {
    ExecutionPlan::new(
        "Single step",
        vec![ExecutionStep::new(1, tool, Map::new(), format!("Call {tool}"))],
        "Anything",
    )
}

#[tokio::test]
async fn weather_in_paris_end_to_end() {
    let backend = ScriptedBackend::new([
        plan_reply(vec![weather_step(1, "Paris")]),
        json!({
            "is_complete": true,
            "is_valid": true,
            "missing_data": [],
            "quality_score": 9,
            "suggestions": []
        }),
    ]);
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = Pipeline::new(gateway(&backend), registry(vec![weather_stub(Arc::clone(&calls))]));

    let response = pipeline.run("get weather in Paris").await.unwrap();

    assert_eq!(response.status, RunStatus::Success);
    assert_eq!(response.results.len(), 1);
    let weather = response.results.get("get_weather").unwrap();
    assert_eq!(weather.len(), 1);
    assert_eq!(weather[0]["city"], "Paris");
    assert_eq!(response.metadata.total_steps, 1);
    assert_eq!(response.metadata.quality_score, 9);
    assert!(response.metadata.errors.is_none());
    assert_eq!(response.execution_plan.steps[0].tool, "get_weather");
    assert_eq!(response.execution_plan.steps[0].parameters["city"], "Paris");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);

    let wire = serde_json::to_value(&response).unwrap();
    assert_eq!(wire["status"], "success");
    assert!(wire["metadata"].get("errors").is_none());
    assert_eq!(wire["execution_plan"]["expected_output"], "Current conditions for each city");
}

#[tokio::test]
async fn degraded_verification_falls_back_and_groups_results() {
    // No judgment reply is scripted, so verification degrades.
    let backend = ScriptedBackend::new([plan_reply(vec![
        weather_step(1, "Paris"),
        weather_step(2, "Atlantis"),
        weather_step(3, "Oslo"),
    ])]);
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = Pipeline::new(gateway(&backend), registry(vec![weather_stub(Arc::clone(&calls))]))
        .with_max_retries(3);

    let response = pipeline.run("weather in three cities").await.unwrap();

    assert_eq!(response.status, RunStatus::Partial);
    assert_eq!(response.metadata.quality_score, 7);
    assert!(!response.metadata.verification.is_complete);
    assert!(response.metadata.verification.is_valid);
    assert_eq!(
        response.metadata.verification.missing_data,
        vec!["Get the weather in Atlantis".to_owned()]
    );

    let cities: Vec<&str> = response
        .results
        .get("get_weather")
        .unwrap()
        .iter()
        .map(|data| data["city"].as_str().unwrap())
        .collect();
    assert_eq!(cities, vec!["Paris", "Oslo"]);

    let errors = response.metadata.errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].step, 2);
    assert_eq!(errors[0].error, "City 'Atlantis' not found");
    // The not-found step is attempted once despite three allowed attempts.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn plan_naming_an_unknown_tool_fails_planning() {
    let mut step = weather_step(1, "Paris");
    step["tool_name"] = json!("get_stock_price");
    let backend = ScriptedBackend::new([plan_reply(vec![step])]);
    let pipeline = Pipeline::new(gateway(&backend), registry(vec![weather_stub(Arc::default())]));

    let err = pipeline.run("price of ACME").await.unwrap_err();
    assert_eq!(err.to_string(), "Planning failed: Invalid tool in plan: get_stock_price");
}

#[tokio::test]
async fn unreachable_model_fails_planning() {
    let backend = ScriptedBackend::new(Vec::<Value>::new());
    let pipeline = Pipeline::new(gateway(&backend), registry(vec![weather_stub(Arc::default())]));

    let err = pipeline.run("weather in Paris").await.unwrap_err();
    assert!(err.to_string().starts_with("Planning failed: LLM generation failed"));
}

#[tokio::test]
async fn malformed_plan_fails_planning() {
    let backend = ScriptedBackend::new([json!({ "task_summary": "missing steps" })]);
    let planner = Planner::new(gateway(&backend), registry(vec![weather_stub(Arc::default())]));

    let err = planner.create_plan("weather in Paris").await.unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Planning failed: "));
    assert!(message.contains("steps"));
}

#[tokio::test]
async fn planned_plan_survives_a_serialization_round_trip() {
    let backend = ScriptedBackend::new([plan_reply(vec![weather_step(1, "Paris"), weather_step(2, "Oslo")])]);
    let planner = Planner::new(gateway(&backend), registry(vec![weather_stub(Arc::default())]));

    let plan = planner.create_plan("weather in Paris and Oslo").await.unwrap();
    let reparsed = ExecutionPlan::from_value(serde_json::to_value(&plan).unwrap()).unwrap();
    assert_eq!(reparsed, plan);
    assert_eq!(plan.steps().len(), 2);
}

#[tokio::test]
async fn missing_tool_fails_its_step_without_invoking_anything() {
    let calls = Arc::new(AtomicUsize::new(0));
    let tools = registry(vec![weather_stub(Arc::clone(&calls))]);
    let plan = single_step_plan("get_stock_price");

    let results = Executor::new(tools).execute_plan(&plan).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].error(), Some("Tool 'get_stock_price' not found"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let verifier = Verifier::new(gateway(&ScriptedBackend::new(Vec::<Value>::new())));
    let output = verifier.verify_and_format(&plan, &results).await;
    assert_eq!(output.status, RunStatus::Failed);
    assert!(output.results.is_empty());
    assert_eq!(output.metadata.quality_score, 0);
}

#[tokio::test]
async fn raising_tool_is_attempted_max_retries_times() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = Executor::new(registry(vec![raising_tool("unstable", Arc::clone(&calls))]))
        .with_max_retries(3);

    let results = executor.execute_plan(&single_step_plan("unstable")).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(results[0].error(), Some("connection reset by peer"));
}

#[tokio::test]
async fn transient_reported_failures_are_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = Executor::new(registry(vec![flaky_tool("get_news", Arc::clone(&calls))]));

    let results = executor.execute_plan(&single_step_plan("get_news")).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!results[0].is_success());
}

#[tokio::test]
async fn zero_attempts_reports_exhaustion() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = Executor::new(registry(vec![raising_tool("unstable", Arc::clone(&calls))]))
        .with_max_retries(0);

    let results = executor.execute_plan(&single_step_plan("unstable")).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(results[0].error(), Some("Execution failed after retries"));
}

#[tokio::test]
async fn results_keep_plan_order() {
    let weather_calls = Arc::new(AtomicUsize::new(0));
    let tools = registry(vec![
        weather_stub(Arc::clone(&weather_calls)),
        flaky_tool("get_news", Arc::default()),
    ]);
    let plan = ExecutionPlan::new(
        "Mixed",
        vec![
            ExecutionStep::new(1, "get_news", Map::new(), "News"),
            ExecutionStep::new(
                2,
                "get_weather",
                serde_json::from_value(json!({ "city": "Oslo" })).unwrap(),
                "Weather",
            ),
            ExecutionStep::new(3, "github_search", Map::new(), "Repos"),
        ],
        "Mixed output",
    );

    let results = Executor::new(tools).execute_plan(&plan).await;
    let order: Vec<u32> = results.iter().map(|result| result.step().step_number()).collect();
    assert_eq!(order, vec![1, 2, 3]);
    assert!(!results[0].is_success());
    assert!(results[1].is_success());
    assert_eq!(results[2].error(), Some("Tool 'github_search' not found"));
}
