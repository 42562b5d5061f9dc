//! Tests for the session commands

mod common;

use common::{field, int, main_frame, point, process, record, session};
use symgroup_core::engine::simulated::StructDef;
use symgroup_core::{Address, ThreadId};
use symgroup_protocol::{AssignEncoding, DisplayFormat, DumpRequest, ResponseKind};

#[test]
fn test_locals_lists_top_level_variables()
{
    let mut process = process();
    let x = int(&mut process, 5);
    let p = point(&mut process, 1, 2);
    main_frame(&mut process, &[("x", "int", x), ("p", "Point", p)]);
    let (mut session, _) = session(process);

    let response = session.locals(1, &DumpRequest::for_frame(0));
    assert!(response.is_success(), "{}", response.payload);
    assert!(response.payload.starts_with("locals=["));

    let x_record = record(&response.payload, "local.x");
    assert_eq!(field(x_record, "name"), Some("x"));
    assert_eq!(field(x_record, "type"), Some("int"));
    assert_eq!(field(x_record, "value"), Some("5"));
    assert_eq!(field(x_record, "valueeditable"), Some("true"));
    assert_eq!(field(x_record, "numchild"), Some("0"));

    let p_record = record(&response.payload, "local.p");
    assert_eq!(field(p_record, "value"), Some("struct Point"));
    assert_eq!(field(p_record, "numchild"), Some("2"));
    assert!(!p_record.contains("children="));
}

#[test]
fn test_locals_with_expanded_struct()
{
    let mut process = process();
    let p = point(&mut process, 1, 2);
    main_frame(&mut process, &[("p", "Point", p)]);
    let (mut session, _) = session(process);

    let request = DumpRequest::for_frame(0).with_expanded(["local.p"]);
    let response = session.locals(1, &request);
    let p_record = record(&response.payload, "local.p");
    assert!(p_record.contains("children=["));
    assert_eq!(field(record(p_record, "local.p.y"), "value"), Some("2"));
    session.locals_tree().unwrap().verify_indices().unwrap();
}

#[test]
fn test_shadowed_locals()
{
    let mut process = process();
    let outer = int(&mut process, 1);
    let inner = int(&mut process, 2);
    main_frame(&mut process, &[("x", "int", outer), ("x", "int", inner)]);
    let (mut session, _) = session(process);

    let response = session.locals(1, &DumpRequest::for_frame(0));
    let outer = record(&response.payload, "local.x");
    let inner = record(&response.payload, "local.x#1");
    assert_eq!(field(outer, "name"), Some("x <shadowed 1>"));
    assert_eq!(field(outer, "value"), Some("1"));
    assert_eq!(field(inner, "name"), Some("x"));
    assert_eq!(field(inner, "value"), Some("2"));
}

#[test]
fn test_uninitialized_variable()
{
    let mut process = process();
    let p = point(&mut process, 1, 2);
    main_frame(&mut process, &[("p", "Point", p)]);
    let (mut session, _) = session(process);

    let mut request = DumpRequest::for_frame(0).with_expanded(["local.p"]);
    request.uninitialized = vec!["local.p".to_string()];
    let response = session.locals(1, &request);
    assert!(response.is_success());
    let p_record = record(&response.payload, "local.p");
    assert_eq!(field(p_record, "value"), Some("<not accessible>"));
    assert_eq!(field(p_record, "numchild"), Some("0"));
    assert!(!p_record.contains("children="));
}

#[test]
fn test_integer_display_format()
{
    let mut process = process();
    let x = int(&mut process, 255);
    main_frame(&mut process, &[("x", "int", x)]);
    let (mut session, _) = session(process);

    let mut request = DumpRequest::for_frame(0);
    request.formats.insert("local.x", DisplayFormat::Hexadecimal);
    let response = session.locals(1, &request);
    assert_eq!(field(record(&response.payload, "local.x"), "value"), Some("0xff"));

    let mut request = DumpRequest::for_frame(0);
    request.formats.insert("int", DisplayFormat::Binary);
    let response = session.locals(2, &request);
    assert_eq!(field(record(&response.payload, "local.x"), "value"), Some("0b11111111"));
}

#[test]
fn test_partial_dump()
{
    let mut process = process();
    let x = int(&mut process, 5);
    let p = point(&mut process, 1, 2);
    main_frame(&mut process, &[("x", "int", x), ("p", "Point", p)]);
    let (mut session, _) = session(process);

    let mut request = DumpRequest::for_frame(0).with_expanded(["local.p"]);
    request.partial = Some("local.p".to_string());
    let response = session.locals(1, &request);
    assert!(response.payload.contains(r#"iname="local.p.x""#));
    assert!(!response.payload.contains(r#"iname="local.x""#));
}

#[test]
fn test_expand_counts_every_prefix()
{
    let mut process = process();
    process.add_struct(
        StructDef::new_struct("Inner", 4).with_field("v", "int", 0),
    );
    process.add_struct(
        StructDef::new_struct("Middle", 4).with_field("c", "Inner", 0),
    );
    process.add_struct(
        StructDef::new_struct("Outer", 8)
            .with_field("b", "Middle", 0)
            .with_field("d", "Inner", 4),
    );
    let a = process.alloc_bytes(&[1, 0, 0, 0, 2, 0, 0, 0]);
    main_frame(&mut process, &[("a", "Outer", a)]);
    let (mut session, _) = session(process);

    let paths = vec!["a.b.c".to_string(), "a.d".to_string()];
    let response = session.expand(1, &paths, &DumpRequest::for_frame(0));
    assert!(response.is_success(), "{}", response.payload);
    assert_eq!(response.payload, r#"expanded="4",errors="""#);

    let tree = session.locals_tree().unwrap();
    for path in ["local.a", "local.a.b", "local.a.d", "local.a.b.c"] {
        let id = tree.find(path).unwrap();
        assert!(tree.is_expanded(id), "{path} not expanded");
    }
    tree.verify_indices().unwrap();
}

#[test]
fn test_expand_is_idempotent()
{
    let mut process = process();
    let p = point(&mut process, 1, 2);
    main_frame(&mut process, &[("p", "Point", p)]);
    let (mut session, _) = session(process);

    let paths = vec!["local.p".to_string()];
    let first = session.expand(1, &paths, &DumpRequest::for_frame(0));
    let second = session.expand(2, &paths, &DumpRequest::for_frame(0));
    assert_eq!(first.payload, r#"expanded="1",errors="""#);
    assert_eq!(second.payload, first.payload);

    let tree = session.locals_tree().unwrap();
    let p = tree.find("local.p").unwrap();
    assert_eq!(tree.children(p).len(), 2);
    assert_eq!(tree.backend().count(), 3);
}

#[test]
fn test_expand_reports_missing_nodes()
{
    let mut process = process();
    let p = point(&mut process, 1, 2);
    main_frame(&mut process, &[("p", "Point", p)]);
    let (mut session, _) = session(process);

    let paths = vec!["local.p".to_string(), "local.nope".to_string()];
    let response = session.expand(1, &paths, &DumpRequest::for_frame(0));
    assert!(response.is_success());
    assert_eq!(response.payload, r#"expanded="1",errors="No such node local.nope""#);
}

#[test]
fn test_assign_integer()
{
    let mut process = process();
    let x = int(&mut process, 5);
    main_frame(&mut process, &[("x", "int", x)]);
    let (mut session, target) = session(process);

    let response = session.assign(2, "local.x", AssignEncoding::Plain, "42", &DumpRequest::for_frame(0));
    assert!(response.is_success(), "{}", response.payload);
    assert_eq!(field(record(&response.payload, "local.x"), "value"), Some("42"));
    assert_eq!(target.process().borrow().read_signed(x, 4).unwrap(), 42);
}

#[test]
fn test_assign_to_missing_node()
{
    let mut process = process();
    let x = int(&mut process, 5);
    main_frame(&mut process, &[("x", "int", x)]);
    let (mut session, _) = session(process);

    let response = session.assign(3, "local.q", AssignEncoding::Plain, "1", &DumpRequest::for_frame(0));
    assert_eq!(response.kind, ResponseKind::Failure);
    assert_eq!(session.lines(&response), vec!["3|N|0|assign|No such node local.q"]);
}

#[test]
fn test_assign_to_struct_is_refused()
{
    let mut process = process();
    let p = point(&mut process, 1, 2);
    main_frame(&mut process, &[("p", "Point", p)]);
    let (mut session, _) = session(process);

    let response = session.assign(1, "local.p", AssignEncoding::Plain, "1", &DumpRequest::for_frame(0));
    assert!(!response.is_success());
    assert_eq!(response.payload, "Node local.p is not editable");
}

#[test]
fn test_type_cast()
{
    let mut process = process();
    let n = int(&mut process, -1);
    main_frame(&mut process, &[("n", "int", n)]);
    let (mut session, _) = session(process);

    let response = session.type_cast(1, "local.n", "unsigned int", &DumpRequest::for_frame(0));
    assert!(response.is_success(), "{}", response.payload);
    let n_record = record(&response.payload, "local.n");
    assert_eq!(field(n_record, "type"), Some("unsigned int"));
    assert_eq!(field(n_record, "value"), Some("4294967295"));
}

#[test]
fn test_type_cast_of_expanded_node_fails()
{
    let mut process = process();
    let p = point(&mut process, 1, 2);
    main_frame(&mut process, &[("p", "Point", p)]);
    let (mut session, _) = session(process);

    let request = DumpRequest::for_frame(0).with_expanded(["local.p"]);
    session.locals(1, &request);
    let response = session.type_cast(2, "local.p", "int", &request);
    assert!(!response.is_success());
    assert_eq!(response.payload, "Cannot change the type of expanded node local.p");
}

#[test]
fn test_collapse_and_remove()
{
    let mut process = process();
    let x = int(&mut process, 5);
    let p = point(&mut process, 1, 2);
    main_frame(&mut process, &[("p", "Point", p), ("x", "int", x)]);
    let (mut session, _) = session(process);
    let request = DumpRequest::for_frame(0);

    session.expand(1, &["local.p".to_string()], &request);
    let response = session.collapse(2, "local.p", &request);
    assert!(response.is_success(), "{}", response.payload);
    assert!(!record(&response.payload, "local.p").contains("children="));

    let response = session.remove(3, "local.p", &request);
    assert!(response.is_success(), "{}", response.payload);
    assert!(!response.payload.contains(r#"iname="local.p""#));
    assert_eq!(field(record(&response.payload, "local.x"), "value"), Some("5"));
    let tree = session.locals_tree().unwrap();
    assert_eq!(tree.backend().count(), 1);
    tree.verify_indices().unwrap();
}

#[test]
fn test_resume_discards_trees()
{
    let mut process = process();
    let p = point(&mut process, 1, 2);
    main_frame(&mut process, &[("p", "Point", p)]);
    let (mut session, target) = session(process);
    let request = DumpRequest::for_frame(0);

    session.expand(1, &["local.p".to_string()], &request);
    let response = session.locals(2, &request);
    assert!(record(&response.payload, "local.p").contains("children="));

    target.resume();
    target.stop();
    let response = session.locals(3, &request);
    assert!(response.is_success());
    assert!(!record(&response.payload, "local.p").contains("children="));
}

#[test]
fn test_session_end_drops_trees()
{
    let mut process = process();
    let x = int(&mut process, 5);
    main_frame(&mut process, &[("x", "int", x)]);
    let (mut session, target) = session(process);

    session.locals(1, &DumpRequest::for_frame(0));
    assert!(session.locals_tree().is_some());
    target.end_session();
    session.handle_events();
    assert!(session.locals_tree().is_none());
}

#[test]
fn test_frame_change_replaces_locals()
{
    let mut process = process();
    let x = int(&mut process, 5);
    let y = int(&mut process, 6);
    main_frame(&mut process, &[("x", "int", x)]);
    process.add_frame(ThreadId(1), 1, "caller", &[("y", "int", y)]);
    let (mut session, _) = session(process);

    let response = session.locals(1, &DumpRequest::for_frame(1));
    assert_eq!(field(record(&response.payload, "local.y"), "value"), Some("6"));
    let response = session.locals(2, &DumpRequest::for_frame(0));
    assert!(!response.payload.contains("local.y"));
    assert_eq!(field(record(&response.payload, "local.x"), "value"), Some("5"));
}

#[test]
fn test_missing_frame_fails()
{
    let (mut session, _) = session(process());
    let response = session.locals(1, &DumpRequest::for_frame(3));
    assert!(!response.is_success());
    assert!(response.payload.contains('3'));
}

#[test]
fn test_long_response_is_chunked()
{
    let mut process = process();
    let locals: Vec<(String, Address)> = (0..50)
        .map(|i| (format!("v{i}"), int(&mut process, i)))
        .collect();
    let refs: Vec<(&str, &str, Address)> = locals.iter().map(|(n, a)| (n.as_str(), "int", *a)).collect();
    main_frame(&mut process, &refs);
    let settings = symgroup_utils::DumpSettings {
        chunk_size: 256,
        ..symgroup_utils::DumpSettings::default()
    };
    let (mut session, _) = common::session_with(process, settings);

    let response = session.locals(9, &DumpRequest::for_frame(0));
    let lines = session.lines(&response);
    assert!(lines.len() > 1);
    assert!(lines.last().unwrap().starts_with("9|R|0|locals|"));

    let mut reassembler = symgroup_protocol::Reassembler::new();
    let mut complete = None;
    for line in &lines {
        complete = reassembler.push(line).unwrap();
    }
    assert_eq!(complete.unwrap(), response);
}
