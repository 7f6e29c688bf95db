use std::sync::Arc;

use atypica_core::Error;
use atypica_core::agent::AgentInvoker;
use atypica_core::config::{AgentModels, DialogueLimits};
use atypica_core::conversation::Role;
use atypica_core::interview::{BatchCoordinator, DialogueEngine, Language, PersonaRef};
use atypica_core::store::{
    InterviewStore, MemoryStore, NewPersona, NewTopic, Persona, PersonaId, Topic,
};
use atypica_core::test_utils::{RecordedRequest, RecordingStatReporter, ScriptedProvider, ScriptedReply};
use atypica_core::tools::ToolServices;
use atypica_tools::tools::SAVE_INTERVIEW_CONCLUSION_TOOL_NAME;
use tokio_util::sync::CancellationToken;

/// Personas answer once; the interviewer saves a conclusion and then closes.
/// The persona whose prompt is `persona-B` cannot be reached.
fn respond(request: &RecordedRequest) -> ScriptedReply {
    let system = request.system.as_deref().unwrap_or_default();
    if system.starts_with("persona-B") {
        return ScriptedReply::failure("upstream unavailable");
    }
    if system.starts_with("persona-") {
        return ScriptedReply::text("我每天早上都会买一杯燕麦拿铁。");
    }

    let mid_turn = request
        .messages
        .last()
        .is_some_and(|m| m.role == Role::Assistant);
    if mid_turn {
        ScriptedReply::text(Language::Zh.closing_phrase())
    } else {
        ScriptedReply::tool_call(
            SAVE_INTERVIEW_CONCLUSION_TOOL_NAME,
            serde_json::json!({
                "conclusion": "愿意为燕麦拿铁多付两元",
                "persona_summary": "28岁上班族",
                "highlights": "\"每天一杯\"",
            }),
        )
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    coordinator: BatchCoordinator,
}

fn harness() -> Harness {
    harness_with(respond)
}

fn harness_with(responder: fn(&RecordedRequest) -> ScriptedReply) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let stats = Arc::new(RecordingStatReporter::default());
    let provider = Arc::new(ScriptedProvider::with_responder(responder));
    let services = Arc::new(ToolServices::new(store.clone(), stats.clone()));
    let limits = DialogueLimits::default();
    let invoker = AgentInvoker::new(provider, services, stats.clone(), limits.max_steps);
    let engine = Arc::new(DialogueEngine::new(
        store.clone(),
        invoker,
        stats,
        AgentModels::default(),
        limits,
        Language::Zh,
    ));
    Harness {
        coordinator: BatchCoordinator::new(store.clone(), engine),
        store,
    }
}

async fn seed(store: &MemoryStore, prompts: &[&str]) -> (Topic, Vec<Persona>) {
    let topic = store
        .create_topic(NewTopic {
            role: "咖啡品牌研究员".to_string(),
            topic: "燕麦拿铁新品".to_string(),
        })
        .await
        .unwrap();
    let mut personas = Vec::new();
    for prompt in prompts {
        personas.push(
            store
                .create_persona(NewPersona {
                    name: prompt.to_string(),
                    prompt: prompt.to_string(),
                    ..NewPersona::default()
                })
                .await
                .unwrap(),
        );
    }
    (topic, personas)
}

fn refs(personas: &[Persona]) -> Vec<PersonaRef> {
    personas
        .iter()
        .map(|p| PersonaRef::new(p.id, p.name.clone()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn one_failing_persona_does_not_affect_the_others() {
    let h = harness();
    let (topic, personas) = seed(&h.store, &["persona-A", "persona-B", "persona-C"]).await;

    let results = h
        .coordinator
        .run_batch(topic.id, &refs(&personas), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    let ids: Vec<PersonaId> = results.iter().map(|r| r.persona_id).collect();
    assert_eq!(ids, personas.iter().map(|p| p.id).collect::<Vec<_>>());

    for index in [0, 2] {
        assert_eq!(results[index].result, "访谈结束");
        assert_eq!(
            results[index].conclusion.as_deref(),
            Some("愿意为燕麦拿铁多付两元")
        );
    }

    assert!(results[1].result.starts_with("访谈遇到问题 "));
    assert!(results[1].result.contains("upstream unavailable"));
    assert_eq!(results[1].conclusion, None);
    assert_eq!(results[1].persona_name, "persona-B");

    let sessions = h.store.list_sessions_for_topic(topic.id).await.unwrap();
    assert_eq!(sessions.len(), 3);
    assert!(sessions.iter().all(|s| s.lease.is_none()));
}

#[tokio::test(start_paused = true)]
async fn a_stalled_persona_times_out_and_the_batch_still_settles() {
    fn stall_b(request: &RecordedRequest) -> ScriptedReply {
        let system = request.system.as_deref().unwrap_or_default();
        if system.starts_with("persona-B") {
            return ScriptedReply::hang();
        }
        respond(request)
    }

    let h = harness_with(stall_b);
    let (topic, personas) = seed(&h.store, &["persona-A", "persona-B", "persona-C"]).await;
    let limits = DialogueLimits::default();

    let started = tokio::time::Instant::now();
    let results = h
        .coordinator
        .run_batch(topic.id, &refs(&personas), CancellationToken::new())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(results[0].result, "访谈结束");
    assert_eq!(results[1].result, "访谈遇到问题 Interview timeout");
    assert_eq!(results[1].conclusion, None);
    assert_eq!(results[2].result, "访谈结束");
    // The stalled run holds the batch until its deadline, then the batch
    // waits out the settle delay before returning.
    assert!(
        elapsed >= limits.timeout() + limits.settle(),
        "returned after {elapsed:?}"
    );

    let sessions = h.store.list_sessions_for_topic(topic.id).await.unwrap();
    assert!(sessions.iter().all(|s| s.lease.is_none()));
}

#[tokio::test(start_paused = true)]
async fn unknown_persona_becomes_an_error_entry() {
    let h = harness();
    let (topic, personas) = seed(&h.store, &["persona-A"]).await;
    let mut requested = refs(&personas);
    requested.push(PersonaRef::new(PersonaId(999), "ghost"));

    let results = h
        .coordinator
        .run_batch(topic.id, &requested, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].result, "访谈结束");
    assert!(results[1].result.starts_with("访谈遇到问题 "));
    assert_eq!(results[1].persona_name, "ghost");
}

#[tokio::test]
async fn oversized_batches_are_rejected_up_front() {
    let h = harness();
    let (topic, personas) = seed(
        &h.store,
        &["persona-1", "persona-2", "persona-3", "persona-4", "persona-5", "persona-6"],
    )
    .await;

    let err = h
        .coordinator
        .run_batch(topic.id, &refs(&personas), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidOperation(_)));
    assert!(h.store.list_sessions_for_topic(topic.id).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rerunning_a_finished_batch_keeps_the_transcripts() {
    let h = harness();
    let (topic, personas) = seed(&h.store, &["persona-A"]).await;

    h.coordinator
        .run_batch(topic.id, &refs(&personas), CancellationToken::new())
        .await
        .unwrap();
    let before = h.store.list_sessions_for_topic(topic.id).await.unwrap();

    let results = h
        .coordinator
        .run_batch(topic.id, &refs(&personas), CancellationToken::new())
        .await
        .unwrap();
    let after = h.store.list_sessions_for_topic(topic.id).await.unwrap();

    assert_eq!(results[0].result, "访谈结束");
    assert_eq!(before[0].id, after[0].id);
    assert_eq!(before[0].messages, after[0].messages);
}
