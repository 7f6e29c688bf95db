use std::sync::Arc;

use atypica_core::agent::AgentInvoker;
use atypica_core::config::ModelId;
use atypica_core::conversation::Role;
use atypica_core::interview::Language;
use atypica_core::scout::{ScoutError, ScoutRunner};
use atypica_core::store::{InterviewStore, MemoryStore, UsageDimension};
use atypica_core::test_utils::{
    RecordingStatReporter, ScriptedProvider, ScriptedReply, StaticContentSearch, note,
};
use atypica_core::tools::ToolServices;
use atypica_tools::tools::{
    CONTENT_SEARCH_TOOL_NAME, SAVE_PERSONA_TOOL_NAME, USER_NOTES_TOOL_NAME,
};
use tokio_util::sync::CancellationToken;

struct Harness {
    store: Arc<MemoryStore>,
    stats: Arc<RecordingStatReporter>,
    provider: Arc<ScriptedProvider>,
    search: Arc<StaticContentSearch>,
    runner: ScoutRunner,
}

fn harness(replies: Vec<ScriptedReply>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let stats = Arc::new(RecordingStatReporter::default());
    let provider = Arc::new(ScriptedProvider::new(replies));
    let search = Arc::new(StaticContentSearch::new(vec![
        note("n1", "u1", "每天一杯燕麦拿铁"),
        note("n2", "u2", "燕麦奶测评"),
    ]));
    let services = Arc::new(
        ToolServices::new(store.clone(), stats.clone()).with_content_search(search.clone()),
    );
    // Scout turns run on their own step budget, not this one.
    let invoker = AgentInvoker::new(provider.clone(), services, stats.clone(), 2);
    let runner = ScoutRunner::new(
        store.clone(),
        &invoker,
        stats.clone(),
        ModelId::from("gpt-4o"),
        Language::Zh,
        30,
    );
    Harness {
        store,
        stats,
        provider,
        search,
        runner,
    }
}

#[tokio::test]
async fn a_pass_saves_personas_on_its_run() {
    let h = harness(vec![
        ScriptedReply::tool_call(
            CONTENT_SEARCH_TOOL_NAME,
            serde_json::json!({"keyword": "燕麦拿铁"}),
        ),
        ScriptedReply::tool_call(USER_NOTES_TOOL_NAME, serde_json::json!({"user_id": "u1"})),
        ScriptedReply::tool_call(
            SAVE_PERSONA_TOOL_NAME,
            serde_json::json!({
                "name": "早八通勤族",
                "tags": ["25-30岁", "白领"],
                "prompt": "你是一名在上海工作的白领，每天早上买一杯燕麦拿铁。"
            }),
        ),
        ScriptedReply::text("已保存1个persona。"),
    ]);

    let report = h
        .runner
        .start("帮我寻找燕麦拿铁的用户", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.steps, 4);
    assert_eq!(report.reply, "已保存1个persona。");
    assert_eq!(report.personas.len(), 1);
    assert_eq!(report.personas[0].name, "早八通勤族");
    assert_eq!(report.personas[0].scout_run_id, Some(report.scout_run_id));
    assert_eq!(h.search.queries(), vec!["search:燕麦拿铁", "user:u1"]);

    let requests = h.provider.requests();
    assert_eq!(requests.len(), 4);
    // No model caller is configured, so reasoning is not offered.
    assert_eq!(
        requests[0].tools,
        vec![CONTENT_SEARCH_TOOL_NAME, SAVE_PERSONA_TOOL_NAME, USER_NOTES_TOOL_NAME]
    );
    assert!(
        requests[0]
            .system
            .as_deref()
            .unwrap()
            .contains(SAVE_PERSONA_TOOL_NAME)
    );

    let run = h.store.get_scout_run(report.scout_run_id).await.unwrap();
    assert_eq!(run.description, "帮我寻找燕麦拿铁的用户");
    assert_eq!(run.messages.len(), 2);
    assert_eq!(run.messages[0].role, Role::User);
    assert_eq!(run.messages[1].role, Role::Assistant);
    assert_eq!(run.messages[1].tool_invocations().count(), 3);

    let reports = h.stats.reports();
    let tokens: Vec<_> = reports
        .iter()
        .filter(|r| r.dimension == UsageDimension::Tokens)
        .collect();
    assert_eq!(tokens.len(), 4);
    assert!(tokens.iter().all(|r| r.session_id.is_none()
        && r.metadata["scout_run_id"] == serde_json::json!(report.scout_run_id)));
    let steps: Vec<_> = reports
        .iter()
        .filter(|r| r.dimension == UsageDimension::Steps)
        .collect();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].value, 4);
}

#[tokio::test]
async fn a_retry_replaces_the_unanswered_request() {
    let h = harness(vec![
        ScriptedReply::failure("upstream unavailable"),
        ScriptedReply::text("好的，只看上海的用户。"),
    ]);
    let run = h.store.create_scout_run("帮我寻找燕麦拿铁的用户").await.unwrap();

    let err = h
        .runner
        .follow_up(run.id, "帮我寻找燕麦拿铁的用户", CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::Invocation(_)));
    let stored = h.store.get_scout_run(run.id).await.unwrap().messages;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].role, Role::User);

    let report = h
        .runner
        .follow_up(run.id, "只找上海的用户", CancellationToken::new())
        .await
        .unwrap();
    assert!(report.personas.is_empty());

    let second = &h.provider.requests()[1];
    assert_eq!(second.messages.len(), 1);
    assert_eq!(second.messages[0].content, "只找上海的用户");

    let stored = h.store.get_scout_run(run.id).await.unwrap().messages;
    let contents: Vec<&str> = stored.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["只找上海的用户", "好的，只看上海的用户。"]);
}

#[tokio::test]
async fn follow_ups_see_the_earlier_conversation() {
    let h = harness(vec![
        ScriptedReply::text("找到了几类用户。"),
        ScriptedReply::text("补充了学生群体。"),
    ]);
    let first = h
        .runner
        .start("帮我寻找燕麦拿铁的用户", CancellationToken::new())
        .await
        .unwrap();
    h.runner
        .follow_up(first.scout_run_id, "再找找学生", CancellationToken::new())
        .await
        .unwrap();

    let second = &h.provider.requests()[1];
    let roles: Vec<Role> = second.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    assert_eq!(
        h.store
            .get_scout_run(first.scout_run_id)
            .await
            .unwrap()
            .messages
            .len(),
        4
    );
}

#[tokio::test]
async fn blank_requests_and_cancellation_stop_before_the_model() {
    let h = harness(vec![ScriptedReply::text("unused")]);

    let err = h
        .runner
        .start("   ", CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::EmptyRequest));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = h
        .runner
        .start("帮我寻找燕麦拿铁的用户", cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::Cancelled));

    assert!(h.provider.requests().is_empty());
}

#[tokio::test]
async fn unknown_runs_are_reported() {
    let h = harness(Vec::new());
    let err = h
        .runner
        .follow_up(
            atypica_core::store::ScoutRunId(42),
            "再找找学生",
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::Store(_)));
}
