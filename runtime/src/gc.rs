use crate::heap::method_area::MethodArea;
use crate::heap::{Heap, ObjRef};
use crate::thread::JavaThreadState;
use crate::vm::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing_log::log::{info, trace};

/// GC runs every 20 ms or so unless configured otherwise.
pub const GC_DEFAULT_INTERVAL_MS: u64 = 20;

/// A somewhat-precise mark-and-sweep collector. Precision comes from the
/// reference table: every reference handed out by the allocation wrappers
/// is recorded there, so the mark phase can reset all entries to Absent,
/// re-mark what the roots reach, and the sweep phase can free everything
/// still Absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefState {
    Absent,
    Present,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GcStats {
    pub gc_time: Duration,
    pub mark_time: Duration,
    pub sweep_time: Duration,
    pub obj_collected: u32,
    pub bytes_reclaimed: usize,
}

/// Root descriptors. Each kind knows how to scan itself in `collect`.
#[derive(Debug, Clone, Copy)]
pub enum GcRootKind {
    /// The base-class instance reference; always live.
    BaseRef(ObjRef),
    /// The base object: its fields and its class's static fields.
    BaseObject(ObjRef),
    /// Every local and live operand slot of every frame in the chain.
    ThreadFrames,
    /// Static fields of every loaded class.
    ClassStatics,
}

pub struct GcRoot {
    pub name: &'static str,
    pub kind: GcRootKind,
}

pub struct GcState {
    ref_tbl: HashMap<ObjRef, RefState>,
    roots: Vec<GcRoot>,
    pub collect_stats: GcStats,
    total_collected: u64,
    last_collect: Instant,
    interval: Duration,
    trace: bool,
}

impl GcState {
    /// `interval_ms` of zero selects the default pacing.
    pub fn new(trace: bool, interval_ms: u64) -> Self {
        let interval_ms = if interval_ms == 0 {
            GC_DEFAULT_INTERVAL_MS
        } else {
            interval_ms
        };
        let mut gc = GcState {
            ref_tbl: HashMap::new(),
            roots: Vec::new(),
            collect_stats: GcStats::default(),
            total_collected: 0,
            last_collect: Instant::now(),
            interval: Duration::from_millis(interval_ms),
            trace,
        };
        // The frame chain and loaded-class statics are roots for the whole
        // process lifetime; the base-object pair arrives at bootstrap.
        gc.add_root("Base Frame", GcRootKind::ThreadFrames);
        gc.add_root("Class Map", GcRootKind::ClassStatics);
        gc
    }

    /// Objects reclaimed across all cycles so far.
    pub fn total_collected(&self) -> u64 {
        self.total_collected
    }

    /// Every allocation wrapper records its reference here as Present.
    pub fn insert_ref(&mut self, r: ObjRef) {
        self.ref_tbl.insert(r, RefState::Present);
    }

    pub fn contains(&self, r: ObjRef) -> bool {
        self.ref_tbl.contains_key(&r)
    }

    pub fn state_of(&self, r: ObjRef) -> Option<RefState> {
        self.ref_tbl.get(&r).copied()
    }

    pub fn ref_count(&self) -> usize {
        self.ref_tbl.len()
    }

    pub fn add_root(&mut self, name: &'static str, kind: GcRootKind) {
        self.roots.push(GcRoot { name, kind });
    }

    /// Registers the base-object roots for the bootstrap thread.
    pub fn register_base_roots(&mut self, base_obj: ObjRef) {
        self.add_root("Base Object Ref.", GcRootKind::BaseRef(base_obj));
        self.add_root("Base Object", GcRootKind::BaseObject(base_obj));
    }

    pub fn should_collect(&self) -> bool {
        self.last_collect.elapsed() > self.interval
    }

    pub fn reset_timer(&mut self) {
        self.last_collect = Instant::now();
    }
}

/// Follows a reference and everything reachable from it, flipping table
/// entries to Present. A reference missing from the table is dangling and
/// is skipped silently. Already-Present entries stop the walk, which also
/// terminates cyclic object graphs.
fn mark_from(ref_tbl: &mut HashMap<ObjRef, RefState>, heap: &Heap, root: ObjRef) {
    let mut worklist = vec![root];
    while let Some(r) = worklist.pop() {
        match ref_tbl.get_mut(&r) {
            None => continue,
            Some(state) => {
                if *state == RefState::Present {
                    continue;
                }
                *state = RefState::Present;
            }
        }
        if let Ok(obj) = heap.get(r) {
            for value in &obj.fields {
                if let Value::Ref(child) = value {
                    worklist.push(*child);
                }
            }
        }
    }
}

fn mark_value(ref_tbl: &mut HashMap<ObjRef, RefState>, heap: &Heap, value: Value) {
    if let Value::Ref(r) = value {
        mark_from(ref_tbl, heap, r);
    }
}

fn scan_class_statics(
    ref_tbl: &mut HashMap<ObjRef, RefState>,
    heap: &Heap,
    method_area: &MethodArea,
) {
    for class in method_area.classes() {
        for field in class.static_fields() {
            mark_value(ref_tbl, heap, field.get());
        }
    }
}

fn mark(
    gc: &mut GcState,
    heap: &Heap,
    method_area: &MethodArea,
    thread: &JavaThreadState,
) {
    for state in gc.ref_tbl.values_mut() {
        *state = RefState::Absent;
    }

    for i in 0..gc.roots.len() {
        let kind = gc.roots[i].kind;
        trace!("scanning root ({})", gc.roots[i].name);
        match kind {
            GcRootKind::BaseRef(r) => {
                if let Some(state) = gc.ref_tbl.get_mut(&r) {
                    *state = RefState::Present;
                }
            }
            GcRootKind::BaseObject(r) => {
                mark_from(&mut gc.ref_tbl, heap, r);
                if let Ok(obj) = heap.get(r) {
                    if let Some(class_id) = obj.class_id {
                        for field in method_area.get_class(&class_id).static_fields() {
                            mark_value(&mut gc.ref_tbl, heap, field.get());
                        }
                    }
                }
            }
            GcRootKind::ThreadFrames => {
                for frame in thread.stack.frames() {
                    for value in frame.locals() {
                        mark_value(&mut gc.ref_tbl, heap, *value);
                    }
                    for value in frame.operands() {
                        mark_value(&mut gc.ref_tbl, heap, *value);
                    }
                }
            }
            GcRootKind::ClassStatics => {
                scan_class_statics(&mut gc.ref_tbl, heap, method_area);
            }
        }
    }
}

fn sweep(gc: &mut GcState, heap: &mut Heap) -> (u32, usize) {
    let dead: Vec<ObjRef> = gc
        .ref_tbl
        .iter()
        .filter(|(_, state)| **state == RefState::Absent)
        .map(|(r, _)| *r)
        .collect();

    let mut collected = 0u32;
    let mut reclaimed = 0usize;
    for r in dead {
        if let Ok(bytes) = heap.free(r.addr) {
            reclaimed += bytes;
        }
        gc.ref_tbl.remove(&r);
        collected += 1;
    }
    (collected, reclaimed)
}

/// One full mark-and-sweep cycle. Records per-cycle statistics and resets
/// the pacing timer.
pub fn collect(
    gc: &mut GcState,
    heap: &mut Heap,
    method_area: &MethodArea,
    thread: &JavaThreadState,
) {
    let mark_start = Instant::now();
    mark(gc, heap, method_area, thread);
    let mark_time = mark_start.elapsed();

    let sweep_start = Instant::now();
    let (collected, reclaimed) = sweep(gc, heap);
    let sweep_time = sweep_start.elapsed();

    gc.collect_stats = GcStats {
        gc_time: mark_time + sweep_time,
        mark_time,
        sweep_time,
        obj_collected: collected,
        bytes_reclaimed: reclaimed,
    };
    gc.total_collected += collected as u64;

    if gc.trace {
        let stats = &gc.collect_stats;
        info!("GC STATS:");
        info!("  Objects collected: {}", stats.obj_collected);
        info!("  Heap Reclaimed:    {}B", stats.bytes_reclaimed);
        info!("  GC Time:           {:?}", stats.gc_time);
        info!("  |__Mark:           {:?}", stats.mark_time);
        info!("  |__Sweep:          {:?}", stats.sweep_time);
    }

    gc.reset_timer();
}
