//! Tests for the watch list

mod common;

use common::{field, int, int_vector, main_frame, point, pointer, process, record, session, VECTOR_OF_INT};
use symgroup_protocol::DumpRequest;

fn watch_list(list: &[(&str, &str)]) -> Vec<(String, String)>
{
    list.iter()
        .map(|(iname, expression)| ((*iname).to_string(), (*expression).to_string()))
        .collect()
}

#[test]
fn test_watches_and_failures()
{
    let mut process = process();
    let x = int(&mut process, 5);
    main_frame(&mut process, &[("x", "int", x)]);
    let (mut session, _) = session(process);

    let watches = watch_list(&[("watch.0", "x"), ("watch.1", "nope")]);
    let response = session.watches(1, &watches, &DumpRequest::for_frame(0));
    assert!(response.is_success(), "{}", response.payload);
    assert!(response.payload.starts_with("watches=["));

    let good = record(&response.payload, "watch.0");
    assert_eq!(field(good, "name"), Some("x"));
    assert_eq!(field(good, "value"), Some("5"));
    assert_eq!(field(good, "valueenabled"), Some("true"));

    let bad = record(&response.payload, "watch.1");
    assert_eq!(field(bad, "name"), Some("nope"));
    assert_eq!(field(bad, "valueenabled"), Some("false"));
    assert_eq!(field(bad, "numchild"), Some("0"));
}

#[test]
fn test_member_watch()
{
    let mut process = process();
    let p = point(&mut process, 7, 8);
    main_frame(&mut process, &[("p", "Point", p)]);
    let (mut session, _) = session(process);

    let response = session.watches(1, &watch_list(&[("watch.0", "p.y")]), &DumpRequest::for_frame(0));
    assert_eq!(field(record(&response.payload, "watch.0"), "value"), Some("8"));
}

#[test]
fn test_removed_watch_disappears()
{
    let mut process = process();
    let x = int(&mut process, 5);
    main_frame(&mut process, &[("x", "int", x)]);
    let (mut session, _) = session(process);
    let request = DumpRequest::for_frame(0);

    session.watches(1, &watch_list(&[("watch.0", "x"), ("watch.1", "x")]), &request);
    let response = session.watches(2, &watch_list(&[("watch.1", "x")]), &request);
    assert!(!response.payload.contains(r#"iname="watch.0""#));
    assert_eq!(field(record(&response.payload, "watch.1"), "value"), Some("5"));

    let tree = session.watch_tree().unwrap();
    assert_eq!(tree.backend().count(), 1);
    tree.verify_indices().unwrap();
}

#[test]
fn test_pointer_watch_is_collapsed_on_resync()
{
    let mut process = process();
    let p = point(&mut process, 1, 2);
    let q = point(&mut process, 30, 40);
    let pp = process.alloc_bytes(&pointer(p));
    main_frame(&mut process, &[("pp", "Point *", pp)]);
    let (mut session, target) = session(process);
    let watches = watch_list(&[("watch.0", "pp")]);

    let expanded = DumpRequest::for_frame(0).with_expanded(["watch.0"]);
    let response = session.watches(1, &watches, &expanded);
    assert_eq!(field(record(&response.payload, "watch.0.x"), "value"), Some("1"));

    target.process().borrow_mut().write_pointer(pp, q).unwrap();
    let response = session.watches(2, &watches, &DumpRequest::for_frame(0));
    assert!(!record(&response.payload, "watch.0").contains("children="));
    let tree = session.watch_tree().unwrap();
    assert!(!tree.is_expanded(tree.find("watch.0").unwrap()));
    assert_eq!(tree.backend().count(), 1);
    tree.verify_indices().unwrap();

    let response = session.watches(3, &watches, &expanded);
    assert_eq!(field(record(&response.payload, "watch.0.x"), "value"), Some("30"));
    assert_eq!(field(record(&response.payload, "watch.0.y"), "value"), Some("40"));
    session.watch_tree().unwrap().verify_indices().unwrap();
}

#[test]
fn test_expanded_container_watch()
{
    let mut process = process();
    let v = int_vector(&mut process, &[3, 4]);
    main_frame(&mut process, &[("v", VECTOR_OF_INT, v)]);
    let (mut session, _) = session(process);

    let request = DumpRequest::for_frame(0).with_expanded(["watch.0"]);
    let response = session.watches(1, &watch_list(&[("watch.0", "v")]), &request);
    assert!(response.is_success(), "{}", response.payload);
    let watch = record(&response.payload, "watch.0");
    assert_eq!(field(watch, "value"), Some("<2 items>"));
    assert_eq!(field(record(watch, "watch.0.1"), "value"), Some("4"));
    assert!(!response.payload.contains("additional"));
}

#[test]
fn test_watches_survive_until_resume()
{
    let mut process = process();
    let x = int(&mut process, 5);
    main_frame(&mut process, &[("x", "int", x)]);
    let (mut session, target) = session(process);
    let request = DumpRequest::for_frame(0);
    let watches = watch_list(&[("watch.0", "x")]);

    session.watches(1, &watches, &request);
    session.locals(2, &request);
    assert!(session.watch_tree().is_some());

    target.resume();
    target.stop();
    session.handle_events();
    assert!(session.watch_tree().is_none());
    assert!(session.locals_tree().is_none());

    let response = session.watches(3, &watches, &request);
    assert_eq!(field(record(&response.payload, "watch.0"), "value"), Some("5"));
}

#[test]
fn test_assign_through_watch()
{
    let mut process = process();
    let x = int(&mut process, 5);
    main_frame(&mut process, &[("x", "int", x)]);
    let (mut session, target) = session(process);
    let request = DumpRequest::for_frame(0);

    session.watches(1, &watch_list(&[("watch.0", "x")]), &request);
    let response = session.assign(2, "watch.0", symgroup_protocol::AssignEncoding::Plain, "9", &request);
    assert!(response.is_success(), "{}", response.payload);
    assert!(response.payload.starts_with("watches=["));
    assert_eq!(field(record(&response.payload, "watch.0"), "value"), Some("9"));
    assert_eq!(target.process().borrow().read_signed(x, 4).unwrap(), 9);
}
