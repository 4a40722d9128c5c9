use super::*;
use crate::query::{BindValue, BuiltQuery, FilterSpec};
use crate::row::JsonRow;
use std::sync::{Arc, Mutex};
use serde_json::json;

// ==================== In-memory collaborators ====================

#[derive(Default)]
struct MemoryCatalog {
    workspaces: Vec<Workspace>,
    compositions: Vec<(String, Composition)>,
    collections: Vec<(String, String, String)>, // workspace id, slug, id
}

impl Catalog for MemoryCatalog {
    async fn workspace_by_slug(&self, slug: &str) -> crate::EngineResult<Option<Workspace>> {
        Ok(self.workspaces.iter().find(|w| w.slug == slug).cloned())
    }

    async fn composition_by_slug(
        &self,
        workspace_id: &str,
        slug: &str,
    ) -> crate::EngineResult<Option<Composition>> {
        Ok(self
            .compositions
            .iter()
            .find(|(ws, c)| ws == workspace_id && c.slug == slug)
            .map(|(_, c)| c.clone()))
    }

    async fn collection_id_by_slug(
        &self,
        workspace_id: &str,
        slug: &str,
    ) -> crate::EngineResult<Option<String>> {
        Ok(self
            .collections
            .iter()
            .find(|(ws, s, _)| ws == workspace_id && s == slug)
            .map(|(_, _, id)| id.clone()))
    }
}

#[derive(Clone, Default)]
struct RecordingExecutor {
    rows: Vec<JsonRow>,
    last: Arc<Mutex<Option<BuiltQuery>>>,
}

impl RecordingExecutor {
    fn returning(rows: Vec<JsonRow>) -> Self {
        Self {
            rows,
            last: Arc::default(),
        }
    }

    fn last_query(&self) -> BuiltQuery {
        self.last.lock().unwrap().clone().expect("no query executed")
    }
}

impl SqlExecutor for RecordingExecutor {
    async fn query(&self, query: &BuiltQuery) -> crate::EngineResult<Vec<JsonRow>> {
        *self.last.lock().unwrap() = Some(query.clone());
        Ok(self.rows.clone())
    }
}

struct FailingExecutor;

impl SqlExecutor for FailingExecutor {
    async fn query(&self, _query: &BuiltQuery) -> crate::EngineResult<Vec<JsonRow>> {
        Err(EngineError::internal("query execution failed"))
    }
}

struct SlowExecutor;

impl SqlExecutor for SlowExecutor {
    async fn query(&self, _query: &BuiltQuery) -> crate::EngineResult<Vec<JsonRow>> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(Vec::new())
    }
}

// ==================== Fixtures ====================

fn expenses_config() -> CompositionConfig {
    CompositionConfig::from_collection("expenses")
}

fn composition(config: CompositionConfig) -> Composition {
    Composition {
        id: "comp-1".into(),
        slug: "report".into(),
        access: AccessLevel::Public,
        is_active: true,
        config,
    }
}

fn catalog_with(composition: Composition) -> MemoryCatalog {
    MemoryCatalog {
        workspaces: vec![Workspace {
            id: "ws-123".into(),
            slug: "acme".into(),
        }],
        compositions: vec![("ws-123".into(), composition)],
        collections: vec![
            ("ws-123".into(), "expenses".into(), "col-456".into()),
            ("ws-123".into(), "customers".into(), "cust-123".into()),
        ],
    }
}

fn row(value: serde_json::Value) -> JsonRow {
    value.as_object().unwrap().clone()
}

fn principal() -> Principal {
    Principal {
        user_id: "user-1".into(),
    }
}

// ==================== execute ====================

#[tokio::test]
async fn execute_returns_rows_and_metadata() {
    let executor = RecordingExecutor::returning(vec![row(json!({"category": "food"}))]);
    let engine = CompositionEngine::new(
        catalog_with(composition(expenses_config())),
        executor.clone(),
    );

    let output = engine
        .execute("acme", "report", ParamBag::new(), ExecuteOptions::default())
        .await
        .unwrap();

    assert_eq!(output.data.len(), 1);
    assert_eq!(output.data[0]["category"], json!("food"));
    assert_eq!(output.metadata.count, 1);
    assert_eq!(output.metadata.composition_id.as_deref(), Some("comp-1"));

    let built = executor.last_query();
    assert!(built.sql().contains("WHERE r.workspace_id = $1"));
    assert_eq!(built.values()[0], BindValue::Text("ws-123".into()));
    assert_eq!(built.values()[1], BindValue::Text("col-456".into()));
}

#[tokio::test]
async fn execute_applies_the_row_ceiling_when_limit_is_absent() {
    let executor = RecordingExecutor::default();
    let engine = CompositionEngine::new(
        catalog_with(composition(expenses_config())),
        executor.clone(),
    );

    engine
        .execute("acme", "report", ParamBag::new(), ExecuteOptions::default())
        .await
        .unwrap();

    let built = executor.last_query();
    assert!(built.sql().contains("LIMIT $3"), "{}", built.sql());
    assert_eq!(built.values().last(), Some(&BindValue::Int(DEFAULT_ROW_CEILING)));
}

#[tokio::test]
async fn execute_keeps_a_configured_limit() {
    let mut config = expenses_config();
    config.limit = Some(25);
    let executor = RecordingExecutor::default();
    let engine = CompositionEngine::new(catalog_with(composition(config)), executor.clone());

    engine
        .execute("acme", "report", ParamBag::new(), ExecuteOptions::default())
        .await
        .unwrap();

    assert_eq!(executor.last_query().values().last(), Some(&BindValue::Int(25)));
}

#[tokio::test]
async fn execute_resolves_the_parameter_bag() {
    let mut config = expenses_config();
    config.filters = vec![FilterSpec::parameterized("status", "eq", "status")];
    let executor = RecordingExecutor::default();
    let engine = CompositionEngine::new(catalog_with(composition(config)), executor.clone());

    let mut params = ParamBag::new();
    params.insert("status".into(), json!("active"));
    engine
        .execute("acme", "report", params, ExecuteOptions::default())
        .await
        .unwrap();

    let built = executor.last_query();
    assert!(built.values().contains(&BindValue::Text("active".into())));
}

#[tokio::test]
async fn unknown_workspace_is_not_found() {
    let engine = CompositionEngine::new(
        catalog_with(composition(expenses_config())),
        RecordingExecutor::default(),
    );

    let err = engine
        .execute("nope", "report", ParamBag::new(), ExecuteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::WorkspaceNotFound));
}

#[tokio::test]
async fn unknown_composition_is_not_found() {
    let engine = CompositionEngine::new(
        catalog_with(composition(expenses_config())),
        RecordingExecutor::default(),
    );

    let err = engine
        .execute("acme", "nope", ParamBag::new(), ExecuteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CompositionNotFound));
}

#[tokio::test]
async fn unknown_source_collection_is_not_found() {
    let engine = CompositionEngine::new(
        catalog_with(composition(CompositionConfig::from_collection("ghosts"))),
        RecordingExecutor::default(),
    );

    let err = engine
        .execute("acme", "report", ParamBag::new(), ExecuteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SourceCollectionNotFound(ref s) if s == "ghosts"));
}

#[tokio::test]
async fn unknown_join_collection_is_not_found() {
    let mut config = expenses_config();
    config.joins = vec![crate::query::JoinSpec {
        collection: "vendors".into(),
        on: crate::query::JoinOn {
            left: "vendor_id".into(),
            right: "id".into(),
        },
        join_type: "inner".into(),
    }];
    let engine = CompositionEngine::new(
        catalog_with(composition(config)),
        RecordingExecutor::default(),
    );

    let err = engine
        .execute("acme", "report", ParamBag::new(), ExecuteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::JoinCollectionNotFound(ref s) if s == "vendors"));
}

// ==================== Access policy ====================

#[tokio::test]
async fn private_compositions_are_forbidden_even_with_a_principal() {
    let mut comp = composition(expenses_config());
    comp.access = AccessLevel::Private;
    let engine = CompositionEngine::new(catalog_with(comp), RecordingExecutor::default());

    let caller = principal();
    let opts = ExecuteOptions {
        principal: Some(&caller),
        ..ExecuteOptions::default()
    };
    let err = engine
        .execute("acme", "report", ParamBag::new(), opts)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden));
}

#[tokio::test]
async fn internal_compositions_require_a_principal() {
    let mut comp = composition(expenses_config());
    comp.access = AccessLevel::Internal;
    let engine = CompositionEngine::new(catalog_with(comp), RecordingExecutor::default());

    let err = engine
        .execute("acme", "report", ParamBag::new(), ExecuteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized));
}

#[tokio::test]
async fn internal_compositions_allow_authenticated_callers() {
    let mut comp = composition(expenses_config());
    comp.access = AccessLevel::Internal;
    let engine = CompositionEngine::new(catalog_with(comp), RecordingExecutor::default());

    let caller = principal();
    let opts = ExecuteOptions {
        principal: Some(&caller),
        ..ExecuteOptions::default()
    };
    assert!(engine.execute("acme", "report", ParamBag::new(), opts).await.is_ok());
}

#[tokio::test]
async fn inactive_compositions_are_forbidden() {
    let mut comp = composition(expenses_config());
    comp.is_active = false;
    let engine = CompositionEngine::new(catalog_with(comp), RecordingExecutor::default());

    let err = engine
        .execute("acme", "report", ParamBag::new(), ExecuteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden));
}

// ==================== Error translation ====================

#[tokio::test]
async fn invalid_identifiers_surface_as_validation_on_execute() {
    let mut config = expenses_config();
    config.select = vec!["bad field".into()];
    let engine = CompositionEngine::new(
        catalog_with(composition(config)),
        RecordingExecutor::default(),
    );

    let err = engine
        .execute("acme", "report", ParamBag::new(), ExecuteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)), "{err:?}");
}

#[tokio::test]
async fn execution_failures_stay_internal() {
    let engine = CompositionEngine::new(
        catalog_with(composition(expenses_config())),
        FailingExecutor,
    );

    let err = engine
        .execute("acme", "report", ParamBag::new(), ExecuteOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), 500);
    assert!(!err.to_string().contains("SELECT"), "{err}");
}

#[tokio::test]
async fn deadline_expiry_cancels_the_request() {
    let engine = CompositionEngine::new(
        catalog_with(composition(expenses_config())),
        SlowExecutor,
    );

    let opts = ExecuteOptions {
        deadline: Some(Duration::from_millis(10)),
        ..ExecuteOptions::default()
    };
    let err = engine
        .execute("acme", "report", ParamBag::new(), opts)
        .await
        .unwrap_err();
    assert!(err.is_deadline_exceeded());
}

// ==================== preview ====================

#[tokio::test]
async fn preview_wraps_rows_in_a_success_envelope() {
    let executor = RecordingExecutor::returning(vec![row(json!({"total": 10}))]);
    let engine = CompositionEngine::new(
        catalog_with(composition(expenses_config())),
        executor,
    );

    let outcome = engine
        .preview("ws-123", &expenses_config(), ParamBag::new(), None)
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.data.as_ref().unwrap().len(), 1);
    let metadata = outcome.metadata.as_ref().unwrap();
    assert_eq!(metadata.count, 1);
    assert!(metadata.composition_id.is_none());
}

#[tokio::test]
async fn preview_reports_build_errors_as_data() {
    let mut config = expenses_config();
    config.filters = vec![FilterSpec::literal("status", "between", json!("x"))];
    let engine = CompositionEngine::new(
        catalog_with(composition(expenses_config())),
        RecordingExecutor::default(),
    );

    let outcome = engine.preview("ws-123", &config, ParamBag::new(), None).await;

    assert!(!outcome.success);
    assert!(outcome.data.is_none());
    let error = outcome.error.unwrap();
    assert!(error.message.contains("unknown operator"), "{}", error.message);
}

#[tokio::test]
async fn preview_names_the_offending_field() {
    let mut config = expenses_config();
    config.group_by = vec!["bad field".into()];
    let engine = CompositionEngine::new(
        catalog_with(composition(expenses_config())),
        RecordingExecutor::default(),
    );

    let outcome = engine.preview("ws-123", &config, ParamBag::new(), None).await;

    assert_eq!(outcome.error.unwrap().field.as_deref(), Some("bad field"));
}

#[tokio::test]
async fn preview_reports_missing_collections() {
    let engine = CompositionEngine::new(
        catalog_with(composition(expenses_config())),
        RecordingExecutor::default(),
    );

    let outcome = engine
        .preview(
            "ws-123",
            &CompositionConfig::from_collection("ghosts"),
            ParamBag::new(),
            None,
        )
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.unwrap().field.as_deref(), Some("ghosts"));
}

#[tokio::test]
async fn preview_envelope_serializes_flat() {
    let engine = CompositionEngine::new(
        catalog_with(composition(expenses_config())),
        RecordingExecutor::default(),
    );

    let outcome = engine
        .preview("ws-123", &expenses_config(), ParamBag::new(), None)
        .await;
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["success"], json!(true));
    assert!(json.get("error").is_none());
    assert!(json["metadata"].get("compositionId").is_none());
}
