//! Integration tests for reading and writing BPMN documents
//!
//! These tests go through the public API only.

use float_cmp::approx_eq;
use flowsync_bpmn::{EMPTY_DIAGRAM, WriteOptions, error::ErrorCode, read, write};
use flowsync_core::{
    geometry::{Bounds, Point, Size},
    identifier::Id,
};

const INVOICE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI" xmlns:dc="http://www.omg.org/spec/DD/20100524/DC" xmlns:di="http://www.omg.org/spec/DD/20100524/DI" xmlns:camunda="http://camunda.org/schema/1.0/bpmn" id="Definitions_1" targetNamespace="http://bpmn.io/schema/bpmn">
  <bpmn:process id="Invoice" isExecutable="true" camunda:historyTimeToLive="180">
    <bpmn:extensionElements>
      <camunda:properties>
        <camunda:property name="owner" value="finance" />
      </camunda:properties>
    </bpmn:extensionElements>
    <bpmn:startEvent id="Received" name="Invoice received" camunda:formKey="embedded:app:start.html" />
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
        <bpmndi:BPMNLabel>
          <dc:Bounds x="128" y="145" width="84" height="14" />
        </bpmndi:BPMNLabel>
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
        <di:waypoint x="330" y="160" />
        <di:waypoint x="420" y="260" />
      </bpmndi:BPMNEdge>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn:definitions>
"#;

#[test]
fn test_extension_content_round_trips() {
    let imported = read(INVOICE).expect("Failed to read invoice diagram");
    let written = write(&imported.document, &imported.graph, WriteOptions::default());

    assert!(written.contains(r#"xmlns:camunda="http://camunda.org/schema/1.0/bpmn""#));
    assert!(written.contains(r#"camunda:historyTimeToLive="180""#));
    assert!(written.contains(r#"<camunda:property name="owner" value="finance"/>"#));
    assert!(written.contains(r#"camunda:candidateGroups="accounting""#));
    assert!(
        written.contains("<bpmn:text>Invoices above 10k need a second approver</bpmn:text>"),
        "Text-only elements should stay on one line: {written}"
    );
    // Label bounds are not shape bounds.
    assert!(written.contains(r#"<dc:Bounds x="128" y="145" width="84" height="14"/>"#));
}

#[test]
fn test_edited_geometry_is_written() {
    let mut imported = read(INVOICE).expect("Failed to read invoice diagram");
    let note = Id::new("Note");
    let assoc = Id::new("Assoc");

    let grown = imported
        .graph
        .shape(note)
        .map(|shape| shape.bounds().with_width(294.0))
        .expect("Note should be drawn");
    imported.graph.set_bounds(note, grown).unwrap();
    imported
        .graph
        .set_waypoints(assoc, vec![Point::new(315.5, 160.0), Point::new(420.25, 200.0)])
        .unwrap();

    let written = write(&imported.document, &imported.graph, WriteOptions::default());
    assert!(written.contains(r#"<dc:Bounds x="400" y="200" width="294" height="40"/>"#));
    assert!(written.contains(r#"<di:waypoint x="315.5" y="160"/>"#));
    assert!(written.contains(r#"<di:waypoint x="420.25" y="200"/>"#));

    let reread = read(&written).expect("Written diagram should read back");
    let note_bounds = reread.graph.shape(note).unwrap().bounds();
    assert!(approx_eq!(f32, note_bounds.width(), 294.0, ulps = 2));
    assert_eq!(reread.graph.connection(assoc).unwrap().waypoints().len(), 2);
}

#[test]
fn test_edge_without_waypoints_gets_declared_prefix() {
    let source = r#"<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI" xmlns:dc="http://www.omg.org/spec/DD/20100524/DC" id="D">
  <process id="P">
    <task id="A" />
    <task id="B" />
    <sequenceFlow id="F" sourceRef="A" targetRef="B" />
  </process>
  <bpmndi:BPMNDiagram id="Diagram">
    <bpmndi:BPMNPlane id="Plane" bpmnElement="P">
      <bpmndi:BPMNShape id="A_di" bpmnElement="A"><dc:Bounds x="0" y="0" width="100" height="80" /></bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="B_di" bpmnElement="B"><dc:Bounds x="200" y="0" width="100" height="80" /></bpmndi:BPMNShape>
      <bpmndi:BPMNEdge id="F_di" bpmnElement="F" />
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</definitions>"#;

    let mut imported = read(source).expect("Failed to read diagram");
    assert!(imported.graph.connection(Id::new("F")).unwrap().waypoints().is_empty());

    imported
        .graph
        .set_waypoints(Id::new("F"), vec![Point::new(100.0, 40.0), Point::new(200.0, 40.0)])
        .unwrap();
    let written = write(&imported.document, &imported.graph, WriteOptions::default());

    assert!(written.contains(r#"xmlns:di="http://www.omg.org/spec/DD/20100524/DI""#));
    let reread = read(&written).expect("Written diagram should read back");
    assert_eq!(
        reread.graph.connection(Id::new("F")).unwrap().waypoints(),
        &[Point::new(100.0, 40.0), Point::new(200.0, 40.0)]
    );
}

#[test]
fn test_empty_diagram_template_round_trips() {
    let imported = read(EMPTY_DIAGRAM).expect("Template should be valid");
    let written = write(&imported.document, &imported.graph, WriteOptions::default());
    let reread = read(&written).expect("Written template should read back");

    assert_eq!(reread.graph, imported.graph);
    let start = reread.graph.shape(Id::new("StartEvent_1")).unwrap();
    assert_eq!(
        start.bounds(),
        Bounds::new_from_top_left(Point::new(180.0, 160.0), Size::new(36.0, 36.0))
    );
}

#[test]
fn test_malformed_input_reports_all_errors() {
    let broken = INVOICE
        .replace(r#"x="240" y="80""#, r#"x="left" y="80""#)
        .replace(r#"height="40""#, r#"height="-40""#);

    let err = read(&broken).expect_err("Broken geometry should fail");
    let codes: Vec<_> = err.diagnostics().iter().filter_map(|diag| diag.code()).collect();

    assert!(codes.contains(&ErrorCode::E202), "{codes:?}");
    assert!(codes.contains(&ErrorCode::E203), "{codes:?}");
    assert!(err.to_string().contains("(+"), "Display should mention the extra errors: {err}");
}
