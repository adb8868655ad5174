//! Integration tests for document sessions
//!
//! These tests drive sessions through the public API with both hosts.

use std::fs;

use float_cmp::approx_eq;
use flowsync::{
    FlowsyncError,
    config::AppConfig,
    engine::DiagramEngine,
    geometry::{Bounds, Point, Size},
    host::MemoryDocument,
    identifier::Id,
    modeler::Modeler,
    registry::active_sessions,
    session::Session,
    sync::SyncPhase,
};
use flowsync_bpmn::{EMPTY_DIAGRAM, read};

const INVOICE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI" xmlns:dc="http://www.omg.org/spec/DD/20100524/DC" xmlns:di="http://www.omg.org/spec/DD/20100524/DI" xmlns:camunda="http://camunda.org/schema/1.0/bpmn" id="Definitions_1" targetNamespace="http://bpmn.io/schema/bpmn">
  <bpmn:process id="Invoice" isExecutable="true" camunda:historyTimeToLive="180">
    <bpmn:startEvent id="Received" name="Invoice received" />
    <bpmn:userTask id="Approve" name="Approve invoice" camunda:candidateGroups="accounting" />
    <bpmn:sequenceFlow id="Flow_1" sourceRef="Received" targetRef="Approve" />
    <bpmn:textAnnotation id="Note">
      <bpmn:text>Invoices above 10k need a second approver</bpmn:text>
    </bpmn:textAnnotation>
    <bpmn:association id="Assoc" sourceRef="Approve" targetRef="Note" />
  </bpmn:process>
  <bpmndi:BPMNDiagram id="BPMNDiagram_1">
    <bpmndi:BPMNPlane id="BPMNPlane_1" bpmnElement="Invoice">
      <bpmndi:BPMNShape id="Received_di" bpmnElement="Received">
        <dc:Bounds x="152" y="102" width="36" height="36" />
      </bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="Approve_di" bpmnElement="Approve">
        <dc:Bounds x="240" y="80" width="100" height="80" />
      </bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="Note_di" bpmnElement="Note">
        <dc:Bounds x="400" y="200" width="100" height="40" />
      </bpmndi:BPMNShape>
      <bpmndi:BPMNEdge id="Flow_1_di" bpmnElement="Flow_1">
        <di:waypoint x="188" y="120" />
        <di:waypoint x="240" y="120" />
      </bpmndi:BPMNEdge>
      <bpmndi:BPMNEdge id="Assoc_di" bpmnElement="Assoc">
        <di:waypoint x="340" y="150" />
        <di:waypoint x="420" y="260" />
      </bpmndi:BPMNEdge>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn:definitions>
"#;

fn open_memory(path: &str, content: &str) -> Session {
    let config = AppConfig::default();
    Session::open(
        Box::new(Modeler::new(&config)),
        Box::new(MemoryDocument::new(path, content)),
        &config,
    )
}

#[test]
fn test_new_file_is_seeded_and_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.bpmn");

    let mut session = Session::open_file(&path, &AppConfig::default());
    assert!(session.ready().is_ok());
    assert_eq!(session.content(), EMPTY_DIAGRAM);
    assert!(!path.exists(), "seeding must not write to disk before a save");

    session.save().expect("save should succeed");
    let on_disk = fs::read_to_string(&path).unwrap();
    assert_eq!(on_disk, session.content());
    let imported = read(&on_disk).expect("saved text should be valid BPMN");
    assert!(imported.graph.shape(Id::new("StartEvent_1")).is_some());
    assert_eq!(session.phase(), SyncPhase::Idle);
}

#[test]
fn test_realign_resizes_reroutes_and_settles() {
    let mut session = open_memory("invoice.bpmn", INVOICE);

    let report = session.realign().expect("realign should succeed");
    assert_eq!(report.resized, vec![Id::new("Note")]);
    assert_eq!(report.rerouted, vec![Id::new("Assoc")]);
    assert_eq!(session.phase(), SyncPhase::Dirty);

    let writes = session.sync_backs();
    let second = session.realign().expect("realign should succeed");
    assert!(second.is_empty(), "second run changed {second:?}");
    assert_eq!(session.sync_backs(), writes);

    let imported = read(session.content()).expect("synced text should be valid BPMN");
    let note = imported.graph.shape(Id::new("Note")).unwrap();
    assert!(approx_eq!(f32, note.bounds().width(), 287.0, ulps = 2));

    let assoc = imported.graph.connection(Id::new("Assoc")).unwrap();
    let last = assoc.last_waypoint().unwrap();
    assert!(note.bounds().is_on_border(last, 0.5));
}

#[test]
fn test_realign_keeps_unrelated_content() {
    let mut session = open_memory("invoice.bpmn", INVOICE);
    session.realign().unwrap();

    let text = session.content();
    assert!(text.contains(r#"camunda:candidateGroups="accounting""#));
    assert!(text.contains(r#"camunda:historyTimeToLive="180""#));
    assert!(text.contains(r#"targetNamespace="http://bpmn.io/schema/bpmn""#));
    assert!(text.contains("Invoices above 10k need a second approver"));
}

#[test]
fn test_realign_and_save_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invoice.bpmn");
    fs::write(&path, INVOICE).unwrap();

    let mut session = Session::open_file(&path, &AppConfig::default());
    session.realign().unwrap();
    session.save().unwrap();
    session.teardown();

    let on_disk = fs::read_to_string(&path).unwrap();
    let imported = read(&on_disk).unwrap();
    assert!(imported.graph.shape(Id::new("Note")).unwrap().bounds().width() > 100.0);
}

#[test]
fn test_external_change_while_idle_is_loaded() {
    let mut session = open_memory("invoice.bpmn", INVOICE);
    let moved = INVOICE.replace(r#"x="240" y="80""#, r#"x="260" y="80""#);

    session.host_mut().set_content(moved.clone());
    session.pump();

    assert_eq!(session.phase(), SyncPhase::Idle);
    assert_eq!(session.content(), moved);
    assert_eq!(session.sync_backs(), 0);
    let export = session.export_image().unwrap();
    assert!(export.svg.contains(r#"data-element-id="Approve""#));
}

#[test]
fn test_external_change_while_dirty_keeps_local_edits() {
    let mut session = open_memory("invoice.bpmn", INVOICE);
    let bounds = Bounds::new_from_top_left(Point::new(500.0, 80.0), Size::new(100.0, 80.0));
    session
        .engine_mut()
        .resize(&Id::new("Approve"), bounds)
        .unwrap();
    session.pump();
    assert_eq!(session.phase(), SyncPhase::Dirty);

    session.host_mut().set_content(EMPTY_DIAGRAM.to_string());
    session.pump();

    assert_eq!(session.phase(), SyncPhase::Dirty);
    assert_eq!(session.ignored_external_changes(), 1);
    let graph = session.engine_mut().snapshot().unwrap();
    assert!(graph.shape(Id::new("Approve")).is_some());
}

#[test]
fn test_broken_document_fails_without_touching_it() {
    let broken = INVOICE.replace("</bpmn:definitions>", "");
    let mut session = open_memory("broken.bpmn", &broken);

    let err = session.ready().expect_err("load should fail");
    assert!(matches!(err, FlowsyncError::Load { .. }));
    let panel = session.error_panel().expect("failed sessions show a panel");
    assert_eq!(panel.title, "Failed to load BPMN diagram");
    assert_eq!(panel.troubleshooting.len(), 3);

    assert!(matches!(session.save(), Err(FlowsyncError::NotReady(_))));
    assert_eq!(session.content(), broken);
}

#[test]
fn test_unreadable_document_fails() {
    let dir = tempfile::tempdir().unwrap();

    // A directory cannot be read as a document.
    let session = Session::open_file(dir.path(), &AppConfig::default());
    assert!(matches!(session.ready(), Err(FlowsyncError::Host(_))));
    assert_eq!(session.phase(), SyncPhase::Failed);
}

#[test]
fn test_sessions_are_registered_until_dropped() {
    let first = open_memory("first.bpmn", EMPTY_DIAGRAM);
    let second = open_memory("second.bpmn", "");
    let (first_id, second_id) = (first.id(), second.id());

    let active = active_sessions();
    assert!(active.iter().any(|summary| summary.id == first_id));
    let summary = active
        .iter()
        .find(|summary| summary.id == second_id)
        .expect("second session is registered");
    assert_eq!(summary.phase, SyncPhase::Idle);

    drop(first);
    let active = active_sessions();
    assert!(!active.iter().any(|summary| summary.id == first_id));
    assert!(active.iter().any(|summary| summary.id == second_id));
}
