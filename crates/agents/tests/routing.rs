use std::sync::Arc;

use futures_util::StreamExt;
use sb_agents::responders::{document_analysis, financial_analysis, DirectResponder, FINANCIAL, GENERAL};
use sb_agents::{Classification, Exchange, IntentDecision, IntentRouter, ResponderRegistry};
use sb_domain::message::Message;
use sb_providers::scripted::{Script, ScriptedProvider};

struct Fixture {
    classifier: Arc<ScriptedProvider>,
    financial: Arc<ScriptedProvider>,
    general: Arc<ScriptedProvider>,
    router: IntentRouter,
}

fn fixture() -> Fixture {
    let classifier = Arc::new(ScriptedProvider::new("classifier"));
    let financial = Arc::new(ScriptedProvider::new("financial"));
    let general = Arc::new(ScriptedProvider::new("general"));

    let registry = Arc::new(ResponderRegistry::new(Arc::new(DirectResponder::new(
        general.clone(),
    ))));
    registry.register(Arc::new(financial_analysis(financial.clone())));
    registry.register(Arc::new(document_analysis(general.clone())));

    let router = IntentRouter::new(registry, classifier.clone());
    Fixture {
        classifier,
        financial,
        general,
        router,
    }
}

async fn collect(stream: sb_domain::stream::FragmentStream) -> String {
    stream.map(|r| r.unwrap()).collect::<Vec<_>>().await.concat()
}

#[tokio::test]
async fn bitcoin_question_goes_to_financial_responder() {
    let f = fixture();
    f.classifier.push_reply(Script::Text(
        r#"{"intent":"crypto_price_query","confidence":0.95,"agent":"FinancialAnalysis","reasoning":"asks for a crypto price"}"#.into(),
    ));
    f.financial
        .push_stream(Script::Fragments(vec!["BTC ".into(), "is volatile.".into()]));

    let exchange = Exchange::new("c1", "What's the current price of Bitcoin?");
    let routed = f.router.route(&exchange).await.unwrap();

    assert_eq!(routed.responder, FINANCIAL);
    assert!(!routed.classification.is_fallback());
    assert_eq!(collect(routed.stream).await, "BTC is volatile.");
    assert!(f.general.requests().is_empty());
}

#[tokio::test]
async fn classifier_failure_falls_back_and_still_answers() {
    let f = fixture();
    f.classifier.push_reply(Script::Fail("HTTP 503".into()));
    f.general.push_stream(Script::Fragments(vec!["hello".into()]));

    let exchange = Exchange::new("c1", "hi there")
        .with_history(vec![Message::user("earlier"), Message::assistant("sure")]);
    let routed = f.router.route(&exchange).await.unwrap();

    let decision = routed.classification.decision();
    assert_eq!(decision.intent, "general_chat");
    assert!((decision.confidence - 0.5).abs() < f64::EPSILON);
    assert!(decision.responder_name.is_none());
    assert!(matches!(routed.classification, Classification::Fallback { .. }));
    assert_eq!(routed.responder, GENERAL);
    assert_eq!(collect(routed.stream).await, "hello");

    // Direct handling sees the whole history plus the new turn.
    assert_eq!(f.general.requests()[0].messages.len(), 3);
}

#[tokio::test]
async fn unparseable_classifier_reply_is_a_fallback() {
    let f = fixture();
    f.classifier
        .push_reply(Script::Text("Sorry, I cannot help with routing.".into()));

    let classification = f.router.classify("anything").await;
    match classification {
        Classification::Fallback { decision, reason } => {
            assert_eq!(decision, IntentDecision::fallback());
            assert!(reason.contains("malformed"));
        }
        other => panic!("expected fallback, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_responder_name_goes_to_default() {
    let f = fixture();
    f.classifier.push_reply(Script::Text(
        r#"{"intent":"weather","confidence":0.8,"agent":"WeatherBot"}"#.into(),
    ));
    f.general.push_stream(Script::Fragments(vec!["sunny".into()]));

    let routed = f.router.route(&Exchange::new("c1", "weather?")).await.unwrap();
    assert_eq!(routed.responder, GENERAL);
    assert!(!routed.classification.is_fallback());
}

#[tokio::test]
async fn classification_prompt_lists_task_responders_only() {
    let f = fixture();
    let prompt = f.router.build_prompt();
    assert!(prompt.contains("- DocumentAnalysis:"));
    assert!(prompt.contains("- FinancialAnalysis:"));
    assert!(prompt.contains("(category: financial)"));
    assert!(!prompt.contains("- General:"));

    f.classifier.push_reply(Script::Text(
        r#"{"intent":"general_chat","confidence":0.9,"agent":null}"#.into(),
    ));
    f.router.classify("hi").await;
    let req = &f.classifier.requests()[0];
    assert!(req.json_mode);
    assert_eq!(req.messages[1].content, "hi");
}

#[test]
fn registry_lists_sorted_and_last_registration_wins() {
    let provider = Arc::new(ScriptedProvider::new("p"));
    let registry = ResponderRegistry::new(Arc::new(DirectResponder::new(provider.clone())));
    registry.register(Arc::new(financial_analysis(provider.clone())));
    registry.register(Arc::new(document_analysis(provider.clone())));
    registry.register(Arc::new(financial_analysis(provider)));

    let names: Vec<String> = registry.list().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["DocumentAnalysis", "FinancialAnalysis", "General"]);
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.default_responder().name(), GENERAL);
    assert!(registry.get("Nope").is_none());
}
