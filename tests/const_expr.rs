use const_hoist_rs::analysis::ConstExprAnalysis;
use const_hoist_rs::ir::{parser, Module, NodeId, NodeKind};

fn find_nodes(module: &Module, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
    module
        .iter_nodes()
        .filter(|(_, node)| pred(&node.kind))
        .map(|(id, _)| id)
        .collect()
}

#[test]
fn test_constants_and_arithmetic_are_const_expr() {
    let module = parser::parse_module(
        r#"
module {
  func @main() {
    %a = const 1 : i64
    %b = const 2 : i64
    %s = add %a, %b : i64
    call @print(%s)
    return
  }
}
"#,
    )
    .unwrap();
    let analysis = ConstExprAnalysis::new(&module);

    for id in find_nodes(&module, |k| matches!(k, NodeKind::Const(_) | NodeKind::Add)) {
        assert!(analysis.is_const_expr(id));
    }
    for id in find_nodes(&module, |k| {
        matches!(k, NodeKind::Call(_) | NodeKind::Return)
    }) {
        assert!(!analysis.is_const_expr(id));
    }
}

#[test]
fn test_root_is_the_maximal_boundary() {
    let module = parser::parse_module(
        r#"
module {
  func @main() {
    %a = const 1 : i64
    %b = const 2 : i64
    %s = add %a, %b : i64
    call @print(%s)
    return
  }
}
"#,
    )
    .unwrap();
    let analysis = ConstExprAnalysis::new(&module);

    let adds = find_nodes(&module, |k| matches!(k, NodeKind::Add));
    assert!(analysis.is_root(adds[0]));
    // Interior constants are reachable only as dependencies of the root.
    for id in find_nodes(&module, |k| matches!(k, NodeKind::Const(_))) {
        assert!(analysis.is_const_expr(id));
        assert!(!analysis.is_root(id));
    }
    assert_eq!(analysis.root_nodes(), adds);
}

#[test]
fn test_parameters_taint_downstream_nodes() {
    let module = parser::parse_module(
        r#"
module {
  func @main(%arg0: i64) {
    %a = const 1 : i64
    %s = add %a, %arg0 : i64
    call @print(%s)
    return
  }
}
"#,
    )
    .unwrap();
    let analysis = ConstExprAnalysis::new(&module);

    let adds = find_nodes(&module, |k| matches!(k, NodeKind::Add));
    assert!(!analysis.is_const_expr(adds[0]));
    // The lone constant now escapes directly into the add.
    let consts = find_nodes(&module, |k| matches!(k, NodeKind::Const(_)));
    assert!(analysis.is_root(consts[0]));
}

#[test]
fn test_loads_are_never_const_expr() {
    let module = parser::parse_module(
        r#"
module {
  global @g : i64
  func @main() {
    %x = load @g : i64
    %a = const 1 : i64
    %s = add %x, %a : i64
    call @print(%s)
    return
  }
}
"#,
    )
    .unwrap();
    let analysis = ConstExprAnalysis::new(&module);

    let loads = find_nodes(&module, |k| matches!(k, NodeKind::GlobalLoad(_)));
    assert!(!analysis.is_const_expr(loads[0]));
    let adds = find_nodes(&module, |k| matches!(k, NodeKind::Add));
    assert!(!analysis.is_const_expr(adds[0]));
}

#[test]
fn test_unused_const_expr_is_a_root() {
    let module = parser::parse_module(
        r#"
module {
  func @main() {
    %dead = const 5 : i64
    return
  }
}
"#,
    )
    .unwrap();
    let analysis = ConstExprAnalysis::new(&module);

    let consts = find_nodes(&module, |k| matches!(k, NodeKind::Const(_)));
    assert!(analysis.is_root(consts[0]));
}

#[test]
fn test_backward_slice_in_program_order() {
    let module = parser::parse_module(
        r#"
module {
  func @main() {
    %a = const 2 : i64
    %b = const 3 : i64
    %m = mul %a, %b : i64
    %n = add %m, %a : i64
    call @use(%n)
    return
  }
}
"#,
    )
    .unwrap();
    let analysis = ConstExprAnalysis::new(&module);

    let consts = find_nodes(&module, |k| matches!(k, NodeKind::Const(_)));
    let muls = find_nodes(&module, |k| matches!(k, NodeKind::Mul));
    let adds = find_nodes(&module, |k| matches!(k, NodeKind::Add));

    // The slice excludes the root itself and comes back in program order.
    let slice = analysis.backward_slice(adds[0]);
    assert_eq!(slice, vec![consts[0], consts[1], muls[0]]);

    assert!(analysis.backward_slice(consts[0]).is_empty());
}

#[test]
fn test_two_independent_roots() {
    let module = parser::parse_module(
        r#"
module {
  func @main() {
    %a = const 2 : i64
    %b = const 3 : i64
    %m = mul %a, %b : i64
    %n = add %m, %a : i64
    call @use_m(%m)
    call @use_n(%n)
    return
  }
}
"#,
    )
    .unwrap();
    let analysis = ConstExprAnalysis::new(&module);

    let muls = find_nodes(&module, |k| matches!(k, NodeKind::Mul));
    let adds = find_nodes(&module, |k| matches!(k, NodeKind::Add));
    // Both escape through calls, so both sit on the boundary even though
    // one feeds the other.
    assert_eq!(analysis.root_nodes(), vec![muls[0], adds[0]]);
}
