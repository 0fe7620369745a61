use cfg_ir::block::Precision;
use cfg_ir::cfg::{Cfg, FunctionDecl};
use cfg_ir::cfg_ref::CfgRef;
use cfg_ir::cfg_rev::CfgRev;
use cfg_ir::hash::signature_hash;
use cfg_ir::statement::{BinOp, Operand};
use cfg_ir::typecheck;
use cfg_ir::types::Type;
use cfg_ir::var::VarFactory;
use cfg_ir::TypedVariable;

fn var(f: &VarFactory, key: &str, ty: Type) -> TypedVariable {
    TypedVariable::new(f.lookup(key), ty)
}

/// Scenario S1: single-block CFG, `get_vars` and canonical rendering.
#[test]
fn single_block_cfg_renders_and_reports_vars() {
    let f = VarFactory::new();
    let (x, y, z) = (
        var(&f, "x", Type::int(32)),
        var(&f, "y", Type::int(32)),
        var(&f, "z", Type::int(32)),
    );

    let mut cfg = Cfg::new("b0", Precision::Num);
    cfg.set_exit("b0");
    let b0 = cfg.get_node_mut(&"b0");
    b0.add(y.clone(), Operand::Var(x.clone()), Operand::Const(1)).unwrap();
    b0.add(z.clone(), Operand::Var(y.clone()), Operand::Const(2)).unwrap();
    b0.ret(vec![z.clone()]).unwrap();

    let names: Vec<String> = cfg.get_vars().iter().map(|v| v.name().to_string()).collect();
    for expected in ["x", "y", "z"] {
        assert!(names.contains(&expected.to_string()), "missing {expected} in {names:?}");
    }

    let rendered = cfg.to_string();
    assert!(rendered.contains("y = x+1;"));
    assert!(rendered.contains("z = y+2;"));
    assert!(rendered.contains("return z;"));

    let before = cfg.len();
    cfg.simplify();
    assert_eq!(cfg.len(), before);
}

/// Invariant 1: predecessor/successor adjacency is mirrored both ways.
#[test]
fn adjacency_is_mirrored() {
    let mut cfg = Cfg::new("entry", Precision::Num);
    cfg.insert("exit");
    cfg.set_exit("exit");
    cfg.connect(&"entry", &"exit");

    assert!(cfg.get_node(&"entry").successors().contains(&"exit"));
    assert!(cfg.get_node(&"exit").predecessors().contains(&"entry"));
}

/// Scenarios S2-S5: merge, unreachable removal, useless removal, and the
/// assume merge barrier, composed in one CFG.
#[test]
fn simplify_merges_prunes_and_respects_barriers() {
    let f = VarFactory::new();
    let a = var(&f, "a", Type::int(32));
    let t = var(&f, "t", Type::int(32));
    let cond = var(&f, "cond", Type::int(32));

    let mut cfg = Cfg::new("entry", Precision::Num);
    cfg.set_exit("exit");
    for label in ["mid", "exit", "dead", "orphan", "guard", "guard_exit"] {
        cfg.insert(label);
    }

    cfg.get_node_mut(&"mid")
        .add(t, Operand::Var(a), Operand::Const(1))
        .unwrap();
    cfg.get_node_mut(&"guard")
        .assume(cfg_ir::number::LinCst::new(
            cfg_ir::number::LinExp::from_var(cond),
            cfg_ir::number::Relation::Geq,
        ))
        .unwrap();

    cfg.connect(&"entry", &"mid");
    cfg.connect(&"mid", &"guard");
    cfg.connect(&"guard", &"guard_exit");
    cfg.connect(&"guard_exit", &"exit");
    cfg.connect(&"entry", &"orphan"); // reachable, can't reach exit (S4)
    // `dead` (S3) stays fully disconnected.

    cfg.simplify();

    let labels: Vec<&&str> = cfg.labels().collect();
    assert!(!labels.contains(&&"dead"), "unreachable block should be pruned");
    assert!(!labels.contains(&&"orphan"), "useless block should be pruned");
    assert!(labels.contains(&&"guard"), "assume block is a merge barrier");
    assert!(labels.contains(&&"exit"));
}

/// Invariant 6: double-reverse entry identity.
#[test]
fn double_reversed_view_recovers_entry() {
    let mut cfg = Cfg::new("entry", Precision::Num);
    cfg.insert("exit");
    cfg.set_exit("exit");
    cfg.connect(&"entry", &"exit");

    let rev = CfgRev::new(&cfg);
    assert_eq!(*rev.entry(), "exit");
    assert_eq!(*rev.exit(), "entry");
}

/// Invariant 7: type-checker idempotence on a well-typed CFG.
#[test]
fn typecheck_is_idempotent() {
    let f = VarFactory::new();
    let x = var(&f, "x", Type::int(32));
    let y = var(&f, "y", Type::int(32));
    let mut cfg = Cfg::new("entry", Precision::Num);
    cfg.get_node_mut(&"entry")
        .bin_op(y, BinOp::Add, Operand::Var(x), Operand::Const(1))
        .unwrap();

    typecheck::check(&cfg).unwrap();
    typecheck::check(&cfg).unwrap();
}

/// Scenario S6: a bitwidth-mismatched `bin_op` fails, naming "bitwidth".
#[test]
fn typecheck_reports_bitwidth_mismatch() {
    let f = VarFactory::new();
    let lhs = var(&f, "x", Type::int(32));
    let rhs = var(&f, "y", Type::int(64));
    let mut cfg = Cfg::new("entry", Precision::Num);
    cfg.get_node_mut(&"entry")
        .bin_op(lhs, BinOp::Add, Operand::Var(rhs), Operand::Const(1))
        .unwrap();

    let err = typecheck::check(&cfg).unwrap_err();
    assert!(err.to_string().contains("bitwidth"));
}

/// Invariant 8: variable factory injectivity and dense indices.
#[test]
fn variable_factory_is_injective_and_dense() {
    let f = VarFactory::with_start(1);
    let a = f.lookup("a");
    let b = f.lookup("b");
    let a_again = f.lookup("a");
    assert_eq!(a, a_again);
    assert_ne!(a, b);
    assert_eq!(a.index(), 1);
    assert_eq!(b.index(), 2);
}

/// Invariant 9: hash equality by function-declaration signature; CFGs
/// without a declaration return a defined error rather than panicking.
#[test]
fn hash_equates_by_signature_and_errors_without_declaration() {
    let f = VarFactory::new();
    let mut a = Cfg::new("entry", Precision::Num);
    a.set_function_decl(
        FunctionDecl::new("f", vec![var(&f, "x", Type::int(32))], vec![var(&f, "y", Type::int(32))]).unwrap(),
    );
    let mut b = Cfg::new("entry", Precision::Num);
    b.set_function_decl(
        FunctionDecl::new("f", vec![var(&f, "p", Type::int(32))], vec![var(&f, "q", Type::int(32))]).unwrap(),
    );
    assert_eq!(signature_hash(&a).unwrap(), signature_hash(&b).unwrap());

    let undeclared: Cfg<&str> = Cfg::new("entry", Precision::Num);
    assert!(signature_hash(&undeclared).is_err());
}

/// `cfg_ref` mirrors the read surface and is fatal when empty.
#[test]
fn cfg_ref_mirrors_and_rejects_empty_access() {
    let mut cfg = Cfg::new("entry", Precision::Num);
    cfg.insert("exit");
    cfg.connect(&"entry", &"exit");

    let r = CfgRef::new(&cfg);
    assert_eq!(*r.entry_label(), "entry");
    assert!(r.next_nodes(&"entry").any(|l| l == &"exit"));
}

#[test]
#[should_panic]
fn cfg_ref_default_is_fatal_on_access() {
    let r: CfgRef<'_, &str> = CfgRef::default();
    let _ = r.entry_label();
}

/// Overlapping function-declaration input/output sets are a constructor
/// error, not a panic.
#[test]
fn overlapping_function_params_are_rejected() {
    let f = VarFactory::new();
    let shared = var(&f, "x", Type::int(32));
    let result = FunctionDecl::new("f", vec![shared.clone()], vec![shared]);
    assert!(result.is_err());
}
