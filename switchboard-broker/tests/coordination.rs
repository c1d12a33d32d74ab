//! End-to-end coordination scenario: two registered agents exchange a
//! correlated request/response pair through the broker.

use serde_json::json;
use switchboard_broker::MessageBroker;
use switchboard_core::{
    priority, AgentCapability, AgentIdentity, AgentMessage, AgentStatus, MessageKind,
};
use switchboard_registry::AgentRegistry;

#[test]
fn request_response_roundtrip_between_registered_agents() {
    let registry = AgentRegistry::new();
    let broker = MessageBroker::new();

    // register a planner and a researcher
    let planner = AgentIdentity::new(
        "planner",
        "Planner",
        AgentCapability::new("planning", "1.0").with_action("plan"),
    )
    .with_status(AgentStatus::Active);
    let researcher = AgentIdentity::new(
        "researcher",
        "Researcher",
        AgentCapability::new("research", "1.0").with_action("web-search"),
    )
    .with_status(AgentStatus::Active);
    registry.register(planner).unwrap();
    registry.register(researcher).unwrap();

    broker.subscribe("planner", &[MessageKind::Response]).unwrap();
    broker
        .subscribe("researcher", &[MessageKind::Request])
        .unwrap();

    // the planner finds someone who can search and sends a high
    // priority request
    let researchers = registry.find_by_capability("web-search").unwrap();
    assert_eq!(researchers.len(), 1);
    let recipient = researchers[0].agent_id.clone();

    let request = AgentMessage::to_agent("planner", recipient.as_str(), MessageKind::Request)
        .with_priority(priority::HIGH)
        .with_payload_entry("query", json!("rust message brokers"));
    let request_id = request.message_id;
    broker.send(request).unwrap();

    // the researcher drains its queue and answers with the correlation
    // id of the request
    let inbox = broker.pending("researcher", None).unwrap();
    assert_eq!(inbox.len(), 1);
    let received = &inbox[0];
    assert_eq!(received.message_id, request_id);
    assert_eq!(received.from_agent, "planner");
    assert_eq!(received.priority, priority::HIGH);
    assert_eq!(received.payload["query"], json!("rust message brokers"));

    registry.update_status("researcher", AgentStatus::Busy).unwrap();
    let response = AgentMessage::to_agent("researcher", "planner", MessageKind::Response)
        .with_correlation(received.message_id)
        .with_payload_entry("results", json!(["a", "b"]));
    broker.send(response).unwrap();
    registry.update_status("researcher", AgentStatus::Idle).unwrap();

    // the planner sees exactly the correlated reply
    let replies = broker.pending("planner", None).unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].correlation_id, Some(request_id));
    assert_eq!(replies[0].payload["results"], json!(["a", "b"]));

    // nothing was lost along the way
    assert!(broker.dead_letters().unwrap().is_empty());
    assert!(registry.stale_agents().unwrap().is_empty());
}
