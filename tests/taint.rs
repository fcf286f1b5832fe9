//! Integration tests for the taint analysis and its merge policy.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use wasm_passes::cfg::Cfg;
use wasm_passes::entity::EntityRef;
use wasm_passes::pass::{Catalog, Lattice, PassOptions, PassRunner};
use wasm_passes::passes::taint::{Taint, TaintAnalysis, TaintEvent, TaintReport, TaintState};
use wasm_passes::*;

struct Fixture {
    module: Module,
    source: Func,
    sink: Func,
    global: Global,
    body: FunctionBody,
    locals: [Local; 2],
}

impl Fixture {
    fn new() -> Fixture {
        let mut module = Module::empty();
        let void = module.add_signature(vec![], vec![]);
        let source_sig = module.add_signature(vec![], vec![Type::I32]);
        let sink_sig = module.add_signature(vec![Type::I32], vec![]);
        let source = module.add_import("env.read_input", source_sig);
        let sink = module.add_import("env.exec", sink_sig);
        module.add_export("taint_source", ExportKind::Func(source));
        module.add_export("taint_sink", ExportKind::Func(sink));
        let global = module.add_global("g", Type::I32, true);
        let mut body = FunctionBody::new(&module, void);
        let locals = [body.add_local(Type::I32), body.add_local(Type::I32)];
        Fixture {
            module,
            source,
            sink,
            global,
            body,
            locals,
        }
    }

    fn source_call(&mut self) -> Expr {
        self.body.call(self.source, vec![])
    }

    fn analyze(self, root: Expr) -> TaintReport {
        let _ = env_logger::try_init();
        let Fixture {
            mut module,
            mut body,
            ..
        } = self;
        body.set_root(root);
        let void = module.add_signature(vec![], vec![]);
        let start = module.add_func("start", void, body);
        module.start_func = Some(start);
        module.validate(true).unwrap();
        TaintAnalysis::run(&module, &PassOptions::default())
    }
}

#[test]
fn source_read_and_overwrite() {
    let mut fx = Fixture::new();
    let l0 = fx.locals[0];
    let call = fx.source_call();
    let set = fx.body.local_set(l0, call);
    let read = fx.body.local_get(l0);
    let drop_read = fx.body.drop_(read);
    let zero = fx.body.i32_const(0);
    let overwrite = fx.body.local_set(l0, zero);
    let reread = fx.body.local_get(l0);
    let drop_reread = fx.body.drop_(reread);
    let root = fx
        .body
        .block(None, vec![set, drop_read, overwrite, drop_reread]);

    let report = fx.analyze(root);
    assert!(report.is_tainted(call));
    assert!(report.is_tainted(read));
    assert!(!report.is_tainted(reread));
    let flows: Vec<&TaintEvent> = report
        .events
        .iter()
        .filter(|event| !event.is_bookkeeping())
        .collect();
    assert_eq!(
        flows,
        vec![
            &TaintEvent::Walking(Func::new(2)),
            &TaintEvent::Source(call),
            &TaintEvent::LocalTainted(l0),
            &TaintEvent::LocalRead(l0),
            &TaintEvent::LocalOverwritten(l0),
        ]
    );
}

#[test]
fn sink_hit_counts() {
    let mut fx = Fixture::new();
    let l0 = fx.locals[0];
    let sink = fx.sink;
    let call = fx.source_call();
    let set = fx.body.local_set(l0, call);
    let tainted_arg = fx.body.local_get(l0);
    let hit = fx.body.call(sink, vec![tainted_arg]);
    let clean_arg = fx.body.i32_const(7);
    let miss = fx.body.call(sink, vec![clean_arg]);
    let root = fx.body.block(None, vec![set, hit, miss]);

    let report = fx.analyze(root);
    assert_eq!(report.sink_hits(), vec![(hit, tainted_arg)]);
    let message = report
        .events
        .iter()
        .find(|event| matches!(event, TaintEvent::SinkReached { .. }))
        .map(|event| event.to_string())
        .unwrap();
    assert!(message.contains("[Taint has reached a sink]"));
}

#[test]
fn direct_source_to_sink() {
    let mut fx = Fixture::new();
    let sink = fx.sink;
    let call = fx.source_call();
    let hit = fx.body.call(sink, vec![call]);
    let report = fx.analyze(hit);
    assert_eq!(report.sink_hits().len(), 1);
    // A tainted argument also taints the call itself.
    assert!(report.is_tainted(hit));
}

#[test]
fn diamond_merges_both_arms() {
    let mut fx = Fixture::new();
    let [l0, l1] = fx.locals;
    let global = fx.global;

    let cond = fx.body.global_get(global);
    let a = fx.source_call();
    let set_a = fx.body.local_set(l0, a);
    let b = fx.source_call();
    let set_b = fx.body.local_set(l1, b);
    let iff = fx.body.if_(cond, set_a, Some(set_b));
    let read0 = fx.body.local_get(l0);
    let sum_left = fx.body.local_get(l1);
    let sum = fx.body.binary(BinaryOp::I32Add, read0, sum_left);
    let drop = fx.body.drop_(sum);
    let root = fx.body.block(None, vec![iff, drop]);

    let report = fx.analyze(root);
    let merge = report.cfg.block_of(read0).unwrap();
    assert_eq!(report.cfg[merge].preds.len(), 2);
    let state = &report.cfg[merge].contents;
    assert!(state.locals.contains(&l0));
    assert!(state.locals.contains(&l1));
    assert!(report.is_tainted(read0));
    assert!(report.is_tainted(sum_left));
    assert!(report.is_tainted(sum));
    assert!(report
        .events
        .iter()
        .any(|event| matches!(event, TaintEvent::Join { .. })));
}

#[test]
fn overwrite_in_one_arm_keeps_may_taint() {
    let mut fx = Fixture::new();
    let l0 = fx.locals[0];
    let global = fx.global;

    let call = fx.source_call();
    let set = fx.body.local_set(l0, call);
    let cond = fx.body.global_get(global);
    let zero = fx.body.i32_const(0);
    let clear = fx.body.local_set(l0, zero);
    let iff = fx.body.if_(cond, clear, None);
    let read = fx.body.local_get(l0);
    let drop = fx.body.drop_(read);
    let root = fx.body.block(None, vec![set, iff, drop]);

    let report = fx.analyze(root);
    assert!(report.is_tainted(read));
}

#[test]
fn dead_code_reports_no_sink_hits() {
    let mut fx = Fixture::new();
    let sink = fx.sink;
    let label = fx.body.add_label();
    let br = fx.body.br(label);
    let call = fx.source_call();
    let hit = fx.body.call(sink, vec![call]);
    let root = fx.body.block(Some(label), vec![br, hit]);

    let report = fx.analyze(root);
    assert!(report.sink_hits().is_empty());
    assert!(!report.is_tainted(call));
    let dead = report.cfg.block_of(hit).unwrap();
    assert!(!report.cfg[dead].reachable);
    assert!(!report
        .events
        .iter()
        .any(|event| matches!(event, TaintEvent::Source(_))));
}

#[test]
fn dead_code_does_not_taint_the_continuation() {
    let mut fx = Fixture::new();
    let l0 = fx.locals[0];
    let sink = fx.sink;
    let label = fx.body.add_label();
    let br = fx.body.br(label);
    let call = fx.source_call();
    let set = fx.body.local_set(l0, call);
    let inner = fx.body.block(Some(label), vec![br, set]);
    let read = fx.body.local_get(l0);
    let use_ = fx.body.call(sink, vec![read]);
    let root = fx.body.block(None, vec![inner, use_]);

    let report = fx.analyze(root);
    let after = report.cfg.block_of(read).unwrap();
    assert!(report.cfg[after].reachable);
    assert_eq!(report.cfg[after].preds.len(), 1);
    assert!(report.cfg[after].contents.locals.is_empty());
    assert!(!report.is_tainted(read));
    assert!(report.sink_hits().is_empty());
}

#[test]
fn globals_and_memory() {
    let mut fx = Fixture::new();
    let global = fx.global;
    let wide = MemArg {
        offset: 16,
        align: 2,
    };
    let same_key = MemArg {
        offset: 18,
        align: 0,
    };
    let other = MemArg {
        offset: 8,
        align: 2,
    };

    let a = fx.source_call();
    let set_global = fx.body.global_set(global, a);
    let ptr = fx.body.i32_const(0);
    let b = fx.source_call();
    let store = fx.body.store(Type::I32, wide, ptr, b);
    let read_global = fx.body.global_get(global);
    let drop_global = fx.body.drop_(read_global);
    let p1 = fx.body.i32_const(0);
    let load_same = fx.body.load(Type::I32, same_key, p1);
    let drop_same = fx.body.drop_(load_same);
    let p2 = fx.body.i32_const(0);
    let load_other = fx.body.load(Type::I32, other, p2);
    let drop_other = fx.body.drop_(load_other);
    let p3 = fx.body.i32_const(0);
    let clean = fx.body.i32_const(1);
    let clear = fx.body.store(Type::I32, wide, p3, clean);
    let p4 = fx.body.i32_const(0);
    let load_cleared = fx.body.load(Type::I32, wide, p4);
    let drop_cleared = fx.body.drop_(load_cleared);
    let root = fx.body.block(
        None,
        vec![
            set_global,
            store,
            drop_global,
            drop_same,
            drop_other,
            clear,
            drop_cleared,
        ],
    );

    let report = fx.analyze(root);
    assert!(report.is_tainted(read_global));
    // Accesses are keyed by offset plus alignment only.
    assert!(report.is_tainted(load_same));
    assert!(!report.is_tainted(load_other));
    assert!(!report.is_tainted(load_cleared));
    assert!(report.events.contains(&TaintEvent::GlobalTainted(global)));
    assert!(report.events.contains(&TaintEvent::MemoryTainted(18)));
    assert!(report.events.contains(&TaintEvent::MemoryOverwritten(18)));
}

#[test]
fn loop_carried_taint_is_not_revisited() {
    let mut fx = Fixture::new();
    let l0 = fx.locals[0];
    let label = fx.body.add_label();

    let head_read = fx.body.local_get(l0);
    let drop_head = fx.body.drop_(head_read);
    let call = fx.source_call();
    let set = fx.body.local_set(l0, call);
    let cond = fx.body.i32_const(1);
    let back = fx.body.br_if(label, cond);
    let inner = fx.body.block(None, vec![drop_head, set, back]);
    let root = fx.body.loop_(label, inner);

    let report = fx.analyze(root);
    let head = report.cfg.block_of(head_read).unwrap();
    // The back-edge exists, but the head was finished before it.
    assert_eq!(report.cfg[head].preds.len(), 2);
    assert!(!report.is_tainted(head_read));
}

#[test]
fn taint_pass_leaves_module_unchanged() {
    let mut fx = Fixture::new();
    let call = fx.source_call();
    let sink = fx.sink;
    let root = fx.body.call(sink, vec![call]);
    let Fixture {
        mut module,
        mut body,
        ..
    } = fx;
    body.set_root(root);
    let void = module.add_signature(vec![], vec![]);
    module.start_func = Some(module.add_func("start", void, body));

    let catalog = Catalog::new();
    let mut runner = PassRunner::new(&catalog);
    runner.add("taint").unwrap();
    let before = module.clone();
    runner.run(&mut module).unwrap();
    assert_eq!(module, before);

    // The pass keeps its findings for the caller.
    let report = runner
        .get_last::<Taint>()
        .and_then(Taint::report)
        .expect("taint pass ran");
    assert_eq!(report.sink_hits(), vec![(root, call)]);
    assert!(report.is_tainted(call));
}

fn random_state(rng: &mut StdRng) -> TaintState {
    let mut state = TaintState::top();
    for _ in 0..rng.gen_range(0..6) {
        state.exprs.add(Expr::new(rng.gen_range(0..24)));
    }
    for _ in 0..rng.gen_range(0..4) {
        state.locals.add(Local::new(rng.gen_range(0..8)));
    }
    for _ in 0..rng.gen_range(0..3) {
        state.globals.add(Global::new(rng.gen_range(0..4)));
    }
    for _ in 0..rng.gen_range(0..3) {
        state.memory.add(rng.gen_range(0..64u64));
    }
    state
}

fn meet(a: &TaintState, b: &TaintState) -> TaintState {
    let mut out = a.clone();
    out.meet_with(b);
    out
}

#[test]
fn join_is_associative_commutative_idempotent() {
    let mut rng = StdRng::seed_from_u64(0x7a1d);
    for _ in 0..200 {
        let n_preds = rng.gen_range(2..=5);
        let preds: Vec<TaintState> = (0..n_preds).map(|_| random_state(&mut rng)).collect();

        let (a, b, c) = (&preds[0], &preds[1], &preds[n_preds - 1]);
        assert_eq!(meet(&meet(a, b), c), meet(a, &meet(b, c)));
        assert_eq!(meet(a, b), meet(b, a));
        assert_eq!(meet(a, a), *a);
        assert_eq!(meet(a, &TaintState::top()), *a);

        // Joining every predecessor into a fresh block gives the same
        // contents whatever order the edges are discovered in.
        let join_in = |order: &[usize]| {
            let mut cfg: Cfg<TaintState> = Cfg::default();
            let blocks: Vec<_> = preds
                .iter()
                .map(|state| {
                    let block = cfg.add_block();
                    cfg[block].contents = state.clone();
                    block
                })
                .collect();
            let target = cfg.add_block();
            for &i in order {
                cfg.add_edge(blocks[i], target);
                cfg.join_edge(blocks[i], target);
            }
            cfg[target].contents.clone()
        };
        let forward: Vec<usize> = (0..n_preds).collect();
        let mut shuffled = forward.clone();
        shuffled.shuffle(&mut rng);
        assert_eq!(join_in(&forward), join_in(&shuffled));

        let union = preds.iter().fold(TaintState::top(), |acc, s| meet(&acc, s));
        assert_eq!(join_in(&forward), union);
    }
}
