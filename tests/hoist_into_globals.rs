use const_hoist_rs::analysis::HoistConfig;
use const_hoist_rs::ir::{parser, printer, Item, Module, NodeKind};
use const_hoist_rs::passes::{HoistIntoGlobalsPass, Pass};

fn optimize(source: &str) -> Module {
    let mut module = parser::parse_module(source).expect("fixture must parse");
    let mut pass = HoistIntoGlobalsPass::new();
    pass.run(&mut module).expect("pass must succeed");
    module
}

fn optimize_with_config(source: &str, config: HoistConfig) -> Module {
    let mut module = parser::parse_module(source).expect("fixture must parse");
    let mut pass = HoistIntoGlobalsPass::with_config(config);
    pass.run(&mut module).expect("pass must succeed");
    module
}

fn global_names(module: &Module) -> Vec<String> {
    module
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Global(g) => Some(g.name.clone()),
            _ => None,
        })
        .collect()
}

fn initializer_count(module: &Module) -> usize {
    module
        .items
        .iter()
        .filter(|item| matches!(item, Item::Initializer(_)))
        .count()
}

fn count_loads_of(module: &Module, name: &str) -> usize {
    module
        .iter_nodes()
        .filter(|(_, node)| matches!(&node.kind, NodeKind::GlobalLoad(n) if n == name))
        .count()
}

#[test]
fn test_hoists_add_of_constants() {
    let module = optimize(
        r#"
module {
  func @main() {
    %a = const 1 : i64
    %b = const 2 : i64
    %sum = add %a, %b : i64
    call @print(%sum)
    return
  }
}
"#,
    );

    let expected = "\
module {
  global private @hoisted : i64
  func @main() {
    %0 = load @hoisted : i64
    call @print(%0)
    return
  }
  initializer {
    %0 = const 1 : i64
    %1 = const 2 : i64
    %2 = add %0, %1 : i64
    store %2 -> @hoisted
    return
  }
}
";
    assert_eq!(printer::print_module(&module), expected);
}

#[test]
fn test_two_escapes_share_one_slot() {
    let module = optimize(
        r#"
module {
  func @main() {
    %a = const 3 : i64
    %b = const 4 : i64
    %m = mul %a, %b : i64
    call @first(%m)
    call @second(%m)
    return
  }
}
"#,
    );

    assert_eq!(global_names(&module), vec!["hoisted"]);
    assert_eq!(initializer_count(&module), 1);
    // Both call sites read the same slot through their own load.
    assert_eq!(count_loads_of(&module, "hoisted"), 2);
}

#[test]
fn test_multi_result_root_materializes_once() {
    let module = optimize(
        r#"
module {
  func @main() {
    %a = const 17 : i64
    %b = const 5 : i64
    %q, %r = divmod %a, %b : i64, i64
    call @use_q(%q)
    call @use_r(%r)
    return
  }
}
"#,
    );

    // One materialization event creates a slot per result.
    assert_eq!(global_names(&module), vec!["hoisted", "hoisted_0"]);
    assert_eq!(initializer_count(&module), 1);
    assert_eq!(count_loads_of(&module, "hoisted"), 1);
    assert_eq!(count_loads_of(&module, "hoisted_0"), 1);

    let divmod_count = module
        .iter_nodes()
        .filter(|(_, node)| matches!(node.kind, NodeKind::DivMod))
        .count();
    assert_eq!(divmod_count, 1, "the shared subgraph is cloned exactly once");
}

#[test]
fn test_mixed_fate_results_still_get_slots() {
    // Only the quotient escapes; the remainder is never used. Both results
    // get slots from the single materialization, by design.
    let module = optimize(
        r#"
module {
  func @main() {
    %a = const 9 : i64
    %b = const 2 : i64
    %q, %r = divmod %a, %b : i64, i64
    call @use_q(%q)
    return
  }
}
"#,
    );

    assert_eq!(global_names(&module), vec!["hoisted", "hoisted_0"]);
    assert_eq!(initializer_count(&module), 1);
    assert_eq!(count_loads_of(&module, "hoisted"), 1);
    assert_eq!(count_loads_of(&module, "hoisted_0"), 0);
}

#[test]
fn test_store_operand_is_preserved() {
    // The sole use is a global-store operand, which the policy rejects:
    // nothing is rewritten and nothing is erased.
    let source = r#"
module {
  global @cache : i64
  func @main() {
    %a = const 7 : i64
    %b = const 8 : i64
    %s = add %a, %b : i64
    store %s -> @cache
    return
  }
}
"#;
    let module = optimize(source);

    assert_eq!(global_names(&module), vec!["cache"]);
    assert_eq!(initializer_count(&module), 0);
    let canonical = printer::print_module(&parser::parse_module(source).unwrap());
    assert_eq!(printer::print_module(&module), canonical);
}

#[test]
fn test_partially_rejected_uses_keep_original_alive() {
    let module = optimize(
        r#"
module {
  global @cache : i64
  func @main() {
    %a = const 7 : i64
    %b = const 8 : i64
    %s = add %a, %b : i64
    store %s -> @cache
    call @print(%s)
    return
  }
}
"#,
    );

    // The call operand is rewritten; the store keeps the original value, so
    // the original computation survives alongside the hoisted clone.
    let printed = printer::print_module(&module);
    assert_eq!(initializer_count(&module), 1);
    assert_eq!(count_loads_of(&module, "hoisted"), 1);
    assert!(printed.contains("store %2 -> @cache"));
    let add_count = module
        .iter_nodes()
        .filter(|(_, node)| matches!(node.kind, NodeKind::Add))
        .count();
    assert_eq!(add_count, 2, "original add retained, clone in initializer");
}

#[test]
fn test_handle_typed_root_is_not_hoisted() {
    let source = r#"
module {
  func @main() {
    %a = const 1 : i64
    %h = pack %a : handle
    call @use(%h)
    return
  }
}
"#;
    let module = optimize(source);

    assert!(global_names(&module).is_empty());
    assert_eq!(initializer_count(&module), 0);
    let canonical = printer::print_module(&parser::parse_module(source).unwrap());
    assert_eq!(printer::print_module(&module), canonical);
}

#[test]
fn test_use_by_rejected_root_is_an_escape() {
    // `pack` is a const-expr root the policy rejects; it stays behind, so
    // the use it makes of the eligible `add` root is rewritten to a load.
    let module = optimize(
        r#"
module {
  func @main() {
    %a = const 1 : i64
    %b = const 2 : i64
    %s = add %a, %b : i64
    %h = pack %s : handle
    call @use(%h)
    call @show(%s)
    return
  }
}
"#,
    );

    assert_eq!(global_names(&module), vec!["hoisted"]);
    assert_eq!(count_loads_of(&module, "hoisted"), 2);
    let add_count = module
        .iter_nodes()
        .filter(|(_, node)| matches!(node.kind, NodeKind::Add))
        .count();
    assert_eq!(add_count, 1, "original add is erased once all uses are loads");
    let pack_count = module
        .iter_nodes()
        .filter(|(_, node)| matches!(node.kind, NodeKind::Pack))
        .count();
    assert_eq!(pack_count, 1);
}

#[test]
fn test_overlapping_subtrees_splice_loads() {
    let module = optimize(
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
    );

    assert_eq!(global_names(&module), vec!["hoisted", "hoisted_0"]);
    assert_eq!(initializer_count(&module), 2);
    // The second initializer reuses the first root's slot instead of
    // cloning the shared multiply again.
    let mul_count = module
        .iter_nodes()
        .filter(|(_, node)| matches!(node.kind, NodeKind::Mul))
        .count();
    assert_eq!(mul_count, 1);
    assert_eq!(count_loads_of(&module, "hoisted"), 2);

    // Declarations first, functions in the middle, initializers appended:
    // the initializer that loads @hoisted follows the one that stores it.
    let printed = printer::print_module(&module);
    let store_pos = printed.find("store %2 -> @hoisted\n").unwrap();
    let splice_pos = printed.rfind("load @hoisted :").unwrap();
    assert!(store_pos < splice_pos);
}

#[test]
fn test_unused_const_expr_is_swept() {
    let module = optimize(
        r#"
module {
  func @main() {
    %unused = const 9 : i64
    %a = const 1 : i64
    call @keep_alive(%a)
    return
  }
}
"#,
    );

    let printed = printer::print_module(&module);
    assert!(!printed.contains("const 9"));
    // The used constant was hoisted and its original erased; the call now
    // reads the slot.
    assert_eq!(count_loads_of(&module, "hoisted"), 1);
}

#[test]
fn test_global_declarations_precede_everything() {
    let module = optimize(
        r#"
module {
  func @main() {
    %a = const 1 : i64
    %b = const 2 : i64
    %s = add %a, %b : i64
    call @print(%s)
    return
  }
  func @other() {
    %c = const 5 : i64
    call @print(%c)
    return
  }
}
"#,
    );

    let first_non_global = module
        .items
        .iter()
        .position(|item| !matches!(item, Item::Global(_)))
        .unwrap();
    let last_global = module
        .items
        .iter()
        .rposition(|item| matches!(item, Item::Global(_)))
        .unwrap();
    assert!(last_global < first_non_global);
    let first_init = module
        .items
        .iter()
        .position(|item| matches!(item, Item::Initializer(_)))
        .unwrap();
    assert!(module.items[first_init..]
        .iter()
        .all(|item| matches!(item, Item::Initializer(_))));
}

#[test]
fn test_idempotent_on_own_output() {
    let sources = [
        r#"
module {
  func @main() {
    %a = const 1 : i64
    %b = const 2 : i64
    %sum = add %a, %b : i64
    call @print(%sum)
    return
  }
}
"#,
        r#"
module {
  func @main() {
    %a = const 17 : i64
    %b = const 5 : i64
    %q, %r = divmod %a, %b : i64, i64
    call @use_q(%q)
    call @use_r(%r)
    return
  }
}
"#,
    ];
    for source in sources {
        let mut module = parser::parse_module(source).unwrap();
        let mut pass = HoistIntoGlobalsPass::new();
        pass.run(&mut module).unwrap();
        let once = printer::print_module(&module);
        pass.run(&mut module).unwrap();
        let twice = printer::print_module(&module);
        assert_eq!(once, twice);
    }
}

#[test]
fn test_deterministic_across_runs() {
    let source = r#"
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
"#;
    let first = printer::print_module(&optimize(source));
    let second = printer::print_module(&optimize(source));
    assert_eq!(first, second);
}

#[test]
fn test_string_hoisting_can_be_disabled() {
    let source = r#"
module {
  func @main() {
    %a = const "foo" : str
    %b = const "bar" : str
    %c = concat %a, %b : str
    call @emit(%c)
    return
  }
}
"#;
    let hoisted = optimize(source);
    assert_eq!(global_names(&hoisted), vec!["hoisted"]);

    let kept = optimize_with_config(
        source,
        HoistConfig {
            hoist_strings: false,
        },
    );
    assert!(global_names(&kept).is_empty());
    assert_eq!(initializer_count(&kept), 0);
}

#[test]
fn test_function_signatures_are_untouched() {
    let module = optimize(
        r#"
module {
  func @scale(%arg0: i64) {
    %a = const 10 : i64
    %b = const 20 : i64
    %s = add %a, %b : i64
    %t = mul %s, %arg0 : i64
    return %t
  }
}
"#,
    );

    let printed = printer::print_module(&module);
    assert!(printed.contains("func @scale(%arg0: i64) {"));
    // The multiply depends on a parameter and is not a constant expression.
    assert!(printed.contains("mul"));
    assert_eq!(count_loads_of(&module, "hoisted"), 1);
}
