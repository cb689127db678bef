/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * End-to-end merge and evaluation tests driven by YAML documents.
 */

use graft_core::{
    ArrayDefault, Error, MemorySecretStore, MergeOptions, Node, PipelineOptions, Registry,
    RunContext, SecretData, SecretError, SecretStore, pipeline,
};
use std::cell::Cell;
use std::rc::Rc;

fn yaml(text: &str) -> Node {
    graft_yaml::parse(text).expect("test YAML should parse")
}

fn run_with(docs: &[&str], options: &PipelineOptions, ctx: &mut RunContext) -> Result<Node, Error> {
    let docs: Vec<Node> = docs.iter().map(|d| yaml(d)).collect();
    pipeline::run(&docs, options, &mut Registry::with_builtins(), ctx)
}

fn run(docs: &[&str]) -> Result<Node, Error> {
    run_with(docs, &PipelineOptions::default(), &mut RunContext::new())
}

#[test]
fn test_templates_are_not_modified() {
    let base = yaml("meta:\n  list: [a, b]\n  map: { x: 1 }\n");
    let overlay = yaml("meta:\n  list: [\"(( append ))\", c]\n  map: { y: 2 }\n");
    let (base0, overlay0) = (base.clone(), overlay.clone());

    let merged = pipeline::run(
        &[base.clone(), overlay.clone()],
        &PipelineOptions::default(),
        &mut Registry::with_builtins(),
        &mut RunContext::new(),
    )
    .unwrap();

    assert_eq!(base, base0);
    assert_eq!(overlay, overlay0);
    assert_eq!(merged, yaml("meta:\n  list: [a, b, c]\n  map: { x: 1, y: 2 }\n"));
}

#[test]
fn test_key_merge_example() {
    let result = run(&[
        r#"
jobs:
  - name: job1
    id: 1
  - name: job2
    id: 2
"#,
        r#"
jobs:
  - (( merge ))
  - name: job2
    org: o2
  - name: job3
    org: o3
"#,
    ])
    .unwrap();

    assert_eq!(
        result,
        yaml(
            r#"
jobs:
  - { name: job1, id: 1 }
  - { name: job2, id: 2, org: o2 }
  - { name: job3, org: o3 }
"#
        )
    );
}

#[test]
fn test_insert_after_numeric_anchor() {
    let result = run(&[
        "list: [first, second]\n",
        "list: [\"(( insert after 0 ))\", X]\n",
    ])
    .unwrap();
    assert_eq!(result, yaml("list: [first, X, second]\n"));
}

#[test]
fn test_insert_keeps_elements_outside_span() {
    let result = run(&[
        "list: [a, b, c, d, e]\n",
        "list: [\"(( insert before 2 ))\", X, Y]\n",
    ])
    .unwrap();
    assert_eq!(result, yaml("list: [a, b, X, Y, c, d, e]\n"));
}

#[test]
fn test_same_anchor_batches_apply_in_sequence() {
    let result = run(&[
        "list: [{ name: a }, { name: z }]\n",
        r#"
list:
  - (( insert after "a" ))
  - { name: b }
  - (( insert after "a" ))
  - { name: c }
"#,
    ])
    .unwrap();
    assert_eq!(
        result,
        yaml("list: [{ name: a }, { name: c }, { name: b }, { name: z }]\n")
    );
}

#[test]
fn test_fallback_append_mode() {
    let docs = ["list: [a, b]\n", "list: [c]\n"];

    let inline = run(&docs).unwrap();
    assert_eq!(inline, yaml("list: [c, b]\n"));

    let options = PipelineOptions {
        merge: MergeOptions {
            array_default: ArrayDefault::Append,
        },
        ..Default::default()
    };
    let appended = run_with(&docs, &options, &mut RunContext::new()).unwrap();
    assert_eq!(appended, yaml("list: [a, b, c]\n"));
}

#[test]
fn test_concat_and_grab() {
    let result = run(&[
        "a:\n  b: value\nout: (( concat \"literal \" a.b ))\ncopy: (( grab out ))\n",
    ])
    .unwrap();
    assert_eq!(result.get("out").and_then(Node::as_str), Some("literal value"));
    assert_eq!(result.get("copy").and_then(Node::as_str), Some("literal value"));

    let err = run(&["a:\n  b: { not: scalar }\nout: (( concat \"literal \" a.b ))\n"]).unwrap_err();
    assert!(err.to_string().contains("$.out: tried to use `a.b`"));
}

#[test]
fn test_grab_unresolved_message() {
    let err = run(&["meta:\n  x: (( grab nope.deeper ))\n"]).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @r"
    1 error(s) detected:
     - $.meta.x: Unable to resolve `nope.deeper`: `$.nope` could not be found in the datastructure
    ");
}

#[test]
fn test_index_out_of_bounds_cites_bound() {
    let tree = yaml("key:\n  list:\n    - { name: a }\n    - { name: b }\n");
    let err = graft_core::resolve_node("key.list.2.name", &tree).unwrap_err();
    assert_eq!(
        err.to_string(),
        "`$.key.list.2` could not be found in the datastructure (index 2 is out of bounds, list has 2 entries)"
    );
}

#[test]
fn test_all_errors_surface_together() {
    let err = run(&[
        "a: (( grab x ))\nb: (( grab y ))\nc:\n  d: (( grab z ))\n",
    ])
    .unwrap_err();
    let Error::Multi(errors) = err else {
        panic!("expected an aggregate error");
    };
    assert_eq!(errors.count(), 3);
}

#[test]
fn test_params_must_be_overridden() {
    let base = "password: (( param \"specify a password\" ))\nuser: admin\n";
    let err = run(&[base]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "1 error(s) detected:\n - $.password: specify a password\n"
    );

    let result = run(&[base, "password: s3cret\n"]).unwrap();
    assert_eq!(result, yaml("password: s3cret\nuser: admin\n"));
}

#[test]
fn test_prune_from_markers_operators_and_options() {
    let options = PipelineOptions {
        prune: vec!["meta".to_string()],
        ..Default::default()
    };
    let result = run_with(
        &[
            "meta: { env: prod }\nscratch: (( prune ))\nkeep: (( grab meta.env ))\nlist: [a, b, c]\n",
            "list: [\"(( inline ))\", a, (( prune ))]\n",
        ],
        &options,
        &mut RunContext::new(),
    )
    .unwrap();
    assert_eq!(result, yaml("keep: prod\nlist: [a, c]\n"));
}

#[test]
fn test_prune_marker_follows_element_across_inserts() {
    let result = run(&[
        "list:\n  - name: a\n    tmp: (( prune ))\n",
        "list:\n  - name: a\n    tmp: 1\n",
        "list:\n  - (( insert before 0 ))\n  - name: z\n    other: 2\n",
    ])
    .unwrap();
    assert_eq!(
        result,
        yaml("list:\n  - name: z\n    other: 2\n  - name: a\n")
    );
}

#[test]
fn test_static_ips_allocation() {
    let manifest = r#"
networks:
  - name: default
    subnets:
      - static: [10.0.0.10 - 10.0.0.20]
jobs:
  - name: web
    instances: 2
    networks:
      - name: default
        static_ips: (( static_ips 0 1 2 ))
  - name: db
    instances: 1
    networks:
      - name: default
        static_ips: (( static_ips 5 ))
"#;
    let result = run(&[manifest]).unwrap();
    let ips = |job: &str| {
        graft_core::Cursor::parse(&format!("jobs.{job}.networks.default.static_ips"))
            .unwrap()
            .resolve(&result)
            .unwrap()
            .clone()
    };
    assert_eq!(ips("web"), yaml("[10.0.0.10, 10.0.0.11]"));
    assert_eq!(ips("db"), yaml("[10.0.0.15]"));
}

#[test]
fn test_static_ips_waits_for_computed_instances() {
    let manifest = r#"
meta:
  count: 2
  range: 10.0.0.10 - 10.0.0.20
jobs:
  - name: web
    networks:
      - name: default
        static_ips: (( static_ips 0 1 ))
    instances: (( grab meta.count ))
networks:
  - name: default
    subnets:
      - static:
          - (( grab meta.range ))
"#;
    let result = run(&[manifest]).unwrap();
    let ips = graft_core::Cursor::parse("jobs.web.networks.default.static_ips")
        .unwrap()
        .resolve(&result)
        .unwrap()
        .clone();
    assert_eq!(ips, yaml("[10.0.0.10, 10.0.0.11]"));
}

#[test]
fn test_static_ips_conflict() {
    let manifest = r#"
networks:
  - name: default
    subnets:
      - static: [10.0.0.10 - 10.0.0.20]
jobs:
  - name: web
    instances: 1
    networks:
      - name: default
        static_ips: (( static_ips 3 ))
  - name: db
    instances: 1
    networks:
      - name: default
        static_ips: (( static_ips 3 ))
"#;
    let err = run(&[manifest]).unwrap_err();
    assert!(err.to_string().contains("already allocated to web/0"));
}

struct CountingStore {
    inner: MemorySecretStore,
    calls: Rc<Cell<usize>>,
}

impl SecretStore for CountingStore {
    fn fetch(&self, path: &str) -> Result<SecretData, SecretError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.fetch(path)
    }
}

#[test]
fn test_vault_fetches_each_path_once() {
    let mut inner = MemorySecretStore::new();
    let mut data = SecretData::new();
    data.insert("user".into(), "admin".into());
    data.insert("password".into(), "hunter2".into());
    inner.insert("secret/db", data);

    let calls = Rc::new(Cell::new(0));
    let mut ctx = RunContext::new().with_secret_store(Box::new(CountingStore {
        inner,
        calls: calls.clone(),
    }));

    let result = run_with(
        &["db:\n  user: (( vault \"secret/db:user\" ))\n  password: (( vault \"secret/db:password\" ))\n  again: (( vault \"secret/db:\" \"password\" ))\n"],
        &PipelineOptions::default(),
        &mut ctx,
    )
    .unwrap();

    assert_eq!(
        result,
        yaml("db:\n  user: admin\n  password: hunter2\n  again: hunter2\n")
    );
    assert_eq!(calls.get(), 1);

    ctx.reset();
    run_with(
        &["pw: (( vault \"secret/db:password\" ))\n"],
        &PipelineOptions::default(),
        &mut ctx,
    )
    .unwrap();
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_vault_store_failure_is_an_operator_error() {
    struct Down {
        calls: Rc<Cell<usize>>,
    }
    impl SecretStore for Down {
        fn fetch(&self, _path: &str) -> Result<SecretData, SecretError> {
            self.calls.set(self.calls.get() + 1);
            Err(SecretError::Transport("connection refused".into()))
        }
    }

    let calls = Rc::new(Cell::new(0));
    let mut ctx = RunContext::new().with_secret_store(Box::new(Down {
        calls: calls.clone(),
    }));
    let err = run_with(
        &["pw: (( vault \"secret/db:password\" ))\nuser: (( vault \"secret/db:user\" ))\n"],
        &PipelineOptions::default(),
        &mut ctx,
    )
    .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @r"
    2 error(s) detected:
     - $.pw: secret store transport error: connection refused
     - $.user: secret store transport error: connection refused
    ");
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_inject_merges_into_parent() {
    let result = run(&[r#"
defaults:
  size: small
  zone: z1
job:
  base: (( inject defaults ))
  size: large
"#])
    .unwrap();
    assert_eq!(
        result.get("job"),
        Some(&yaml("size: large\nzone: z1\n"))
    );
}

#[test]
fn test_dependency_cycle_is_fatal() {
    let err = run(&["a: (( grab b ))\nb: (( grab c ))\nc: (( grab a ))\n"]).unwrap_err();
    assert!(matches!(err, Error::Cycle { .. }));
    assert_eq!(
        err.to_string(),
        "$: cycle detected in operator data-flow graph: $.a, $.b, $.c"
    );
}

#[test]
fn test_quoted_call_is_a_literal() {
    let result = run(&["text: 'say (( grab x )) please'\n"]).unwrap();
    assert_eq!(
        result.get("text").and_then(Node::as_str),
        Some("say (( grab x )) please")
    );
}

#[test]
fn test_non_map_root_rejected() {
    let err = run(&["- a\n- b\n"]).unwrap_err();
    assert_eq!(err.to_string(), "$: document 1 has a list at its root, not a map");
}
