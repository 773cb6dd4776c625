//! Integration tests for the ArgoCD tools against a mock ArgoCD API
//!
//! Covers:
//! - Response caching and forced refresh
//! - Filtering on cached responses
//! - Application detail, resource tree and name validation
//! - Cluster and repository listings
//! - Sync completion, failure, vanished operations and timeouts
//! - History ordering and rollback lookup
//! - Workspace cache maintenance

use kubiya_core::{Tool, ToolInput};
use kubiya_tools::cache::FileCache;
use kubiya_tools::poll::PollConfig;
use kubiya_tools::tools::argocd::{
    ArgoCDApplicationHistoryTool, ArgoCDGetApplicationTool, ArgoCDListApplicationsTool,
    ArgoCDListClustersTool, ArgoCDListRepositoriesTool, ArgoCDSyncApplicationTool,
    ArgoCDWorkspaceManagerTool,
};
use kubiya_tools::ToolsConfig;
use serde_json::{json, Value};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn workspace() -> (TempDir, ToolsConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = ToolsConfig::default().with_workspace(dir.path());
    (dir, config)
}

fn input(server: &MockServer) -> ToolInput {
    ToolInput::new()
        .without_process_env()
        .with_env("ARGOCD_SERVER", server.uri())
        .with_env("ARGOCD_TOKEN", "test-token")
}

fn app(name: &str, health: &str, sync: &str) -> Value {
    json!({
        "metadata": {"name": name},
        "spec": {
            "project": "default",
            "destination": {"server": "https://kubernetes.default.svc", "namespace": name},
            "source": {"repoURL": "https://github.com/argoproj/argocd-example-apps", "path": name}
        },
        "status": {"health": {"status": health}, "sync": {"status": sync}}
    })
}

fn fast_poll() -> PollConfig {
    PollConfig::new(3, Duration::from_millis(10))
}

// ============================================================================
// LIST APPLICATIONS
// ============================================================================

#[tokio::test]
async fn test_list_applications_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [app("guestbook", "Healthy", "Synced"), app("billing", "Degraded", "OutOfSync")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDListApplicationsTool::new(&config);

    let first = tool.execute(input(&server)).await.unwrap();
    assert!(first.success);
    assert!(first.output.contains("Cached applications list to workspace"));
    assert!(first.output.contains("Found 2 applications"));
    assert!(first.output.contains("guestbook"));

    let second = tool.execute(input(&server)).await.unwrap();
    assert!(second.success);
    assert!(second.output.contains("Using cached applications list from"));
    assert_eq!(second.data.unwrap()["cached"], json!(true));

    let files = FileCache::new(config.cache_dir("argocd")).list().await.unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].name.starts_with("apps_"));
}

#[tokio::test]
async fn test_list_applications_refresh_bypasses_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(2)
        .mount(&server)
        .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDListApplicationsTool::new(&config);

    let first = tool.execute(input(&server)).await.unwrap();
    assert!(first.output.contains("No applications found"));

    let refreshed = tool
        .execute(input(&server).with_arg("refresh", "true"))
        .await
        .unwrap();
    assert_eq!(refreshed.data.unwrap()["cached"], json!(false));
}

#[tokio::test]
async fn test_list_applications_filters_and_project_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications"))
        .and(query_param("projects", "payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                app("api", "Healthy", "Synced"),
                app("worker", "Degraded", "Synced"),
                app("cron", "Healthy", "OutOfSync")
            ]
        })))
        .mount(&server)
        .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDListApplicationsTool::new(&config);
    let result = tool
        .execute(
            input(&server)
                .with_arg("project_filter", "payments")
                .with_arg("health_filter", "Healthy")
                .with_arg("output_format", "json"),
        )
        .await
        .unwrap();

    let data = result.data.unwrap();
    assert_eq!(data["total"], json!(2));
    let names: Vec<&str> = data["applications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["metadata"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["api", "cron"]);
    // json output carries no status lines
    assert!(result.output.trim_start().starts_with('['));
}

#[tokio::test]
async fn test_list_applications_http_error_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid session"})))
        .expect(2)
        .mount(&server)
        .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDListApplicationsTool::new(&config);

    for _ in 0..2 {
        let result = tool.execute(input(&server)).await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("argocd account generate-token"));
    }
    assert!(FileCache::new(config.cache_dir("argocd")).list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_token_is_config_error() {
    let (_dir, config) = workspace();
    let tool = ArgoCDListApplicationsTool::new(&config);
    let err = tool
        .execute(ToolInput::new().without_process_env().with_env("ARGOCD_SERVER", "argocd.local"))
        .await
        .unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("ARGOCD_TOKEN"));
}

// ============================================================================
// SYNC
// ============================================================================

async fn mount_sync(server: &MockServer, operation: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/v1/applications/guestbook/sync"))
        .and(body_json(json!({"dryRun": false, "prune": true, "force": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"metadata": {"name": "guestbook"}})))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/guestbook/operation"))
        .respond_with(operation)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/guestbook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(app("guestbook", "Healthy", "Synced")))
        .mount(server)
        .await;
}

fn sync_input(server: &MockServer) -> ToolInput {
    input(server).with_arg("app_name", "guestbook").with_arg("prune", "true")
}

#[tokio::test]
async fn test_sync_succeeds() {
    let server = MockServer::start().await;
    mount_sync(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "operation": {"sync": {"phase": "Succeeded", "message": "successfully synced"}}
        })),
    )
    .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDSyncApplicationTool::new(&config).with_poll(fast_poll());
    let result = tool.execute(sync_input(&server)).await.unwrap();

    assert!(result.success, "{}", result.output);
    assert!(result.output.contains("Sync initiated successfully"));
    assert!(result.output.contains("Sync completed successfully!"));
    assert!(result.output.contains("Final Application Status:"));
    assert!(result.output.contains("  Health: Healthy"));
}

#[tokio::test]
async fn test_sync_failure_reports_result() {
    let server = MockServer::start().await;
    mount_sync(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "operation": {"sync": {
                "phase": "Failed",
                "message": "one or more objects failed to apply",
                "result": {"resources": [{"kind": "Deployment", "name": "web", "status": "SyncFailed"}]}
            }}
        })),
    )
    .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDSyncApplicationTool::new(&config).with_poll(fast_poll());
    let result = tool.execute(sync_input(&server)).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.exit_code, 1);
    assert!(result.output.contains("Sync failed: one or more objects failed to apply"));
    assert!(result.output.contains("SyncFailed"));
}

#[tokio::test]
async fn test_sync_without_operation_completes() {
    let server = MockServer::start().await;
    mount_sync(&server, ResponseTemplate::new(404)).await;

    let (_dir, config) = workspace();
    let tool = ArgoCDSyncApplicationTool::new(&config).with_poll(fast_poll());
    let result = tool.execute(sync_input(&server)).await.unwrap();

    assert!(result.success);
    assert!(result.output.contains("Sync completed (no active operation)"));
}

#[tokio::test]
async fn test_sync_times_out() {
    let server = MockServer::start().await;
    mount_sync(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "operation": {"sync": {"phase": "Running", "message": "waiting for healthy state"}}
        })),
    )
    .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDSyncApplicationTool::new(&config).with_poll(fast_poll());
    let result = tool.execute(sync_input(&server)).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.data.unwrap()["timed_out"], json!(true));
    assert!(result.output.contains("after 3 checks"));
    assert!(result.output.contains("Status: Running - waiting for healthy state"));
}

#[tokio::test]
async fn test_sync_rejects_bad_resource_selector() {
    let server = MockServer::start().await;
    let (_dir, config) = workspace();
    let tool = ArgoCDSyncApplicationTool::new(&config);
    let err = tool
        .execute(sync_input(&server).with_arg("resources", "Deployment"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Expected Kind/Name"));
}

// ============================================================================
// HISTORY
// ============================================================================

async fn mount_history(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/guestbook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {"name": "guestbook"},
            "status": {"history": [
                {"id": 1, "revision": "a1b2c3d4e5f6", "deployedAt": "2024-01-01T10:00:00Z",
                 "initiatedBy": {"username": "alice"}},
                {"id": 2, "revision": "f6e5d4c3b2a1", "deployedAt": "2024-01-02T10:00:00Z",
                 "initiatedBy": {"automated": true}}
            ]}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_history_newest_first() {
    let server = MockServer::start().await;
    mount_history(&server).await;

    let (_dir, config) = workspace();
    let tool = ArgoCDApplicationHistoryTool::new(&config);
    let result = tool
        .execute(input(&server).with_arg("app_name", "guestbook").with_arg("output_format", "summary"))
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.output.contains("Total revisions: 2"));
    let newest = result.output.find("f6e5d4c3b2a1").unwrap();
    let oldest = result.output.find("a1b2c3d4e5f6").unwrap();
    assert!(newest < oldest);
    assert!(result.output.contains("by automated"));
}

#[tokio::test]
async fn test_rollback_by_revision_prefix() {
    let server = MockServer::start().await;
    mount_history(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/applications/guestbook/rollback"))
        .and(body_json(json!({"id": 1, "dryRun": false, "prune": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"metadata": {"name": "guestbook"}})))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDApplicationHistoryTool::new(&config);
    let result = tool
        .execute(
            input(&server)
                .with_arg("app_name", "guestbook")
                .with_arg("action", "rollback")
                .with_arg("revision", "a1b2c3d"),
        )
        .await
        .unwrap();

    assert!(result.success, "{}", result.output);
    assert!(result.output.contains("history id 1"));
}

#[tokio::test]
async fn test_rollback_unknown_revision() {
    let server = MockServer::start().await;
    mount_history(&server).await;

    let (_dir, config) = workspace();
    let tool = ArgoCDApplicationHistoryTool::new(&config);
    let result = tool
        .execute(
            input(&server)
                .with_arg("app_name", "guestbook")
                .with_arg("action", "rollback")
                .with_arg("revision", "a1b"),
        )
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.error.unwrap().contains("Revision a1b not found"));
}

// ============================================================================
// GET APPLICATION
// ============================================================================

fn resource_tree(count: usize) -> Value {
    let nodes: Vec<Value> = (0..count)
        .map(|i| json!({"kind": "Pod", "name": format!("pod-{}", i), "health": {"status": "Healthy"}}))
        .collect();
    json!({ "nodes": nodes })
}

fn cache_file_names(config: &ToolsConfig) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(config.cache_dir("argocd"))
        .map(|dir| {
            dir.filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn test_get_application_caches_app_and_resources_under_one_digest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/guestbook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(app("guestbook", "Healthy", "Synced")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/guestbook/resource-tree"))
        .respond_with(ResponseTemplate::new(200).set_body_json(resource_tree(2)))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDGetApplicationTool::new(&config);

    let first = tool.execute(input(&server).with_arg("app_name", "guestbook")).await.unwrap();
    assert!(first.success, "{}", first.output);
    assert!(first.output.contains("Name: guestbook"));
    assert!(first.output.contains("  - Pod/pod-1 - Healthy"));

    let second = tool.execute(input(&server).with_arg("app_name", "guestbook")).await.unwrap();
    assert!(second.output.contains("Using cached application data from"));

    let names = cache_file_names(&config);
    assert_eq!(names.len(), 2, "{:?}", names);
    let app_digest = names[0].strip_prefix("app_").unwrap();
    let resources_digest = names[1].strip_prefix("resources_").unwrap();
    assert_eq!(app_digest, resources_digest);
}

#[tokio::test]
async fn test_get_application_survives_resource_tree_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/guestbook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(app("guestbook", "Healthy", "Synced")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/guestbook/resource-tree"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "tree unavailable"})))
        .mount(&server)
        .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDGetApplicationTool::new(&config);
    let result = tool.execute(input(&server).with_arg("app_name", "guestbook")).await.unwrap();

    assert!(result.success, "{}", result.output);
    assert!(result.output.contains("Health Status: Healthy"));
    assert!(!result.output.contains("Resources:"));
    assert_eq!(result.data.unwrap()["resources"], Value::Null);
    assert_eq!(cache_file_names(&config).len(), 1);
}

#[tokio::test]
async fn test_get_application_lists_at_most_twenty_resources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/guestbook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(app("guestbook", "Healthy", "Synced")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/guestbook/resource-tree"))
        .respond_with(ResponseTemplate::new(200).set_body_json(resource_tree(25)))
        .mount(&server)
        .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDGetApplicationTool::new(&config);
    let result = tool.execute(input(&server).with_arg("app_name", "guestbook")).await.unwrap();

    assert!(result.success, "{}", result.output);
    assert!(result.output.contains("  - Pod/pod-19 - Healthy"));
    assert!(!result.output.contains("Pod/pod-20 "));
    assert!(result.output.contains("  ... and 5 more resources"));
}

#[tokio::test]
async fn test_get_application_rejects_path_like_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/clusters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"metadata": {"name": "CLUSTERS"}})))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDGetApplicationTool::new(&config);

    for name in ["../clusters", "guestbook/resource-tree", "Guestbook", "guestbook?x=1", "-guestbook"] {
        let err = tool
            .execute(
                input(&server)
                    .with_arg("app_name", name)
                    .with_arg("include_resources", "false"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid application name"), "{}", name);
    }
    assert!(cache_file_names(&config).is_empty());

    let history = ArgoCDApplicationHistoryTool::new(&config);
    assert!(history
        .execute(input(&server).with_arg("app_name", "../clusters"))
        .await
        .is_err());
}

// ============================================================================
// CLUSTERS AND REPOSITORIES
// ============================================================================

#[tokio::test]
async fn test_list_clusters_table_and_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/clusters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [
            {"name": "in-cluster", "server": "https://kubernetes.default.svc",
             "serverVersion": "1.29", "connectionState": {"status": "Successful"}},
            {"name": "staging", "server": "https://staging.example.com",
             "info": {"serverVersion": "1.28", "connectionState": {"status": "Failed", "message": "timeout"}}}
        ]})))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDListClustersTool::new(&config);

    let table = tool.execute(input(&server)).await.unwrap();
    assert!(table.success, "{}", table.output);
    assert!(table.output.contains("Cached clusters list to workspace"));
    assert!(table.output.contains("https://staging.example.com"));
    assert!(table.output.contains("Failed"));
    assert!(table.output.contains("timeout"));

    let summary = tool
        .execute(input(&server).with_arg("output_format", "summary"))
        .await
        .unwrap();
    assert!(summary.output.contains("Using cached clusters list from"));
    assert!(summary.output.contains("Total clusters: 2"));
    assert_eq!(summary.data.unwrap()["cached"], json!(true));
}

#[tokio::test]
async fn test_list_clusters_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/clusters"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "permission denied"})))
        .mount(&server)
        .await;

    let (_dir, config) = workspace();
    let result = ArgoCDListClustersTool::new(&config).execute(input(&server)).await.unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap().contains("Authorization failed"));
}

#[tokio::test]
async fn test_list_repositories_filters_by_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [
            {"repo": "https://github.com/argoproj/argocd-example-apps", "type": "git",
             "connectionState": {"status": "Successful"}},
            {"repo": "https://charts.bitnami.com/bitnami", "type": "helm",
             "connectionState": {"status": "Successful"}}
        ]})))
        .mount(&server)
        .await;

    let (_dir, config) = workspace();
    let tool = ArgoCDListRepositoriesTool::new(&config);

    let helm = tool.execute(input(&server).with_arg("repo_type", "helm")).await.unwrap();
    assert!(helm.success, "{}", helm.output);
    assert!(helm.output.contains("https://charts.bitnami.com/bitnami"));
    assert!(!helm.output.contains("argocd-example-apps"));
    assert_eq!(helm.data.unwrap()["repositories"].as_array().unwrap().len(), 1);

    let all = tool
        .execute(input(&server).with_arg("output_format", "summary"))
        .await
        .unwrap();
    assert!(all.output.contains("Total repositories: 2"));
}

#[tokio::test]
async fn test_list_repositories_rejects_unknown_type() {
    let server = MockServer::start().await;
    let (_dir, config) = workspace();
    let err = ArgoCDListRepositoriesTool::new(&config)
        .execute(input(&server).with_arg("repo_type", "svn"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid repo_type 'svn'"));
}

// ============================================================================
// WORKSPACE MANAGER
// ============================================================================

#[tokio::test]
async fn test_workspace_cleanup_removes_day_old_files() {
    let (_dir, config) = workspace();
    let cache_dir = config.cache_dir("argocd");
    std::fs::create_dir_all(&cache_dir).unwrap();
    std::fs::write(cache_dir.join("apps_fresh.json"), "{}").unwrap();
    let stale = cache_dir.join("clusters_stale.json");
    std::fs::write(&stale, "{}").unwrap();
    std::fs::File::options()
        .write(true)
        .open(&stale)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(48 * 3600))
        .unwrap();

    let tool = ArgoCDWorkspaceManagerTool::new(&config);
    let result = tool
        .execute(ToolInput::new().with_arg("action", "cleanup"))
        .await
        .unwrap();

    assert!(result.success, "{}", result.output);
    assert!(result.output.contains("Cleaned 1 old cache files (>24 hours)"));
    assert!(result.output.contains("Remaining cache files: 1"));
    assert!(!stale.exists());
    assert_eq!(cache_file_names(&config), vec!["apps_fresh.json".to_string()]);
}
