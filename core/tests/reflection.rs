use std::thread;

use ironstone_core::ir::expr::ExprType;
use ironstone_core::ir::reflection::catalog::CATALOG;
use ironstone_core::ir::reflection::{
    methods, BundledLibrary, HandleKind, OpHandle, ReflectionCache, RuntimeLibrary, Signature, MAX_BLOCK_ARITY,
};

#[test]
fn fixed_arity_yields_up_to_four() {
    let cache = methods();
    for k in 0..=MAX_BLOCK_ARITY {
        assert_eq!(cache.yield_(k).name, format!("Yield{}", k));
        assert_eq!(cache.yield_splat(k).name, format!("YieldSplat{}", k));
    }
    assert_eq!(cache.yield_(5).name, "YieldN");
    assert_eq!(cache.yield_splat(5).name, "YieldSplatN");
    assert_eq!(cache.yield_(12).name, "YieldN");
}

#[test]
fn yield_dispatch_without_splat_counts_rhs() {
    let cache = methods();

    let plain = cache.yield_dispatch(2, false, false);
    assert_eq!(plain.op.name, "Yield2");
    assert!(!plain.has_argument_array);

    let with_rhs = cache.yield_dispatch(4, false, true);
    assert_eq!(with_rhs.op.name, "YieldN");
    assert!(with_rhs.has_argument_array);
    assert!(!with_rhs.has_rhs_slot);
}

#[test]
fn yield_dispatch_with_splat_and_rhs() {
    let cache = methods();

    let small = cache.yield_dispatch(2, true, true);
    assert_eq!(small.op.name, "YieldSplat2");
    assert!(!small.has_argument_array);
    assert!(!small.has_rhs_slot);

    let boundary = cache.yield_dispatch(3, true, true);
    assert_eq!(boundary.op.name, "YieldSplat3");
    assert!(!boundary.has_argument_array);

    let large = cache.yield_dispatch(4, true, true);
    assert_eq!(large.op.name, "YieldSplatNRhs");
    assert!(large.has_argument_array);
    assert!(large.has_rhs_slot);
}

#[test]
fn argument_array_iff_adjusted_count_exceeds_block_arity() {
    let cache = methods();
    for argc in 0..8 {
        for has_splat in [false, true] {
            for has_rhs in [false, true] {
                let dispatch = cache.yield_dispatch(argc, has_splat, has_rhs);
                let adjusted = argc + usize::from(has_rhs);
                assert_eq!(dispatch.has_argument_array, adjusted > MAX_BLOCK_ARITY, "argc {} splat {} rhs {}", argc, has_splat, has_rhs);
            }
        }
    }
}

#[test]
fn repeated_lookups_share_one_handle() {
    let first: &'static OpHandle = methods().method("IsTrue");
    let second: &'static OpHandle = methods().method("IsTrue");
    assert!(std::ptr::eq(first, second));

    let addresses: Vec<usize> = (0..8)
        .map(|_| thread::spawn(|| methods().method("IsTrue") as *const OpHandle as usize))
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().expect("lookup thread panicked"))
        .collect();
    assert!(addresses.iter().all(|address| *address == first as *const OpHandle as usize));
}

#[test]
fn bundled_library_resolves_whole_catalog() {
    let cache = methods();
    assert_eq!(cache.library(), "ironstone-runtime");
    assert_eq!(cache.len(), CATALOG.len());
    assert!(!cache.is_empty());
    assert_eq!(cache.field("DefaultArgument").kind, HandleKind::Field);
    assert!(cache.try_method("NoSuchPrimitive").is_none());
}

#[test]
fn suffix_families_select_specialized_primitives() {
    let cache = methods();
    assert_eq!(cache.create_mutable_string("LM").name, "CreateMutableStringLM");
    assert_eq!(cache.create_mutable_string("N").name, "CreateMutableStringN");
    assert_eq!(cache.create_symbol("MM").name, "CreateSymbolMM");
    assert_eq!(cache.create_regex("ML").name, "CreateRegexML");
    assert_eq!(cache.create_regex("M").params.last(), Some(&ExprType::Integer));
}

#[test]
#[should_panic(expected = "no CreateSymbol primitive for suffix 'LL'")]
fn unknown_suffix_is_a_bug() {
    methods().create_symbol("LL");
}

#[test]
fn make_array_switches_to_array_form_after_five() {
    let cache = methods();
    assert_eq!(cache.make_array(0).name, "MakeArray0");
    assert_eq!(cache.make_array(5).name, "MakeArray5");
    assert_eq!(cache.make_array(6).name, "MakeArrayN");
}

#[test]
#[should_panic(expected = "called with a wrong number of arguments")]
fn invoking_with_wrong_arity_panics() {
    methods().method("IsTrue").invoke(Vec::new());
}

/// A runtime library that lacks one primitive.
struct IncompleteLibrary;

impl RuntimeLibrary for IncompleteLibrary {
    fn name(&self) -> &str {
        "incomplete"
    }

    fn lookup(&self, kind: HandleKind, name: &str) -> Option<Signature> {
        if name == "Yield3" {
            return None;
        }
        BundledLibrary.lookup(kind, name)
    }
}

/// A runtime library whose `IsTrue` takes the wrong parameter type.
struct DriftedLibrary;

impl RuntimeLibrary for DriftedLibrary {
    fn name(&self) -> &str {
        "drifted"
    }

    fn lookup(&self, kind: HandleKind, name: &str) -> Option<Signature> {
        if name == "IsTrue" {
            return Some(Signature { params: vec![ExprType::Integer], return_type: ExprType::Boolean });
        }
        BundledLibrary.lookup(kind, name)
    }
}

#[test]
#[should_panic(expected = "runtime library does not export primitive: Yield3 (incomplete)")]
fn missing_primitive_fails_resolution() {
    ReflectionCache::resolve(&IncompleteLibrary);
}

#[test]
#[should_panic(expected = "runtime library primitive has an unexpected signature: IsTrue (drifted)")]
fn signature_drift_fails_resolution() {
    ReflectionCache::resolve(&DriftedLibrary);
}
