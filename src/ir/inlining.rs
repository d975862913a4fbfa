//! Single-site function inlining.
//!
//! Splices a clone of a callee's body into a caller at one call site:
//! arguments are bound to the callee's entry parameters, the callee's
//! blocks are cloned in depth-first preorder, returns and throws are
//! rewired into the caller's control flow, and debug scopes are rebuilt so
//! the inlined code stays attributable to the callee as called from the
//! caller.
//!
//! This module performs exactly one splice per call. Call-graph analysis,
//! recursion detection, and the policy that decides which sites are worth
//! inlining live with the caller; so does deleting the original apply
//! instruction afterwards.

use super::{
    FunctionRepresentation, IrBlockId, IrBlockParam, IrDebugScope, IrFunctionId, IrId, IrInstKind,
    IrInstruction, IrLocation, IrModule, IrScopeArena, IrScopeId, IrTermKind, IrTerminator,
    OwnershipKind, ScopeParent,
};
use fxhash::FxHashMap;
use log::{debug, trace};
use std::collections::BTreeMap;

/// Which inlining contract is being performed.
///
/// The two flavors differ in debug-info treatment and in which callees are
/// permitted; the splicing itself is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineKind {
    /// Required by language semantics; runs before most optimization.
    /// Foreign callees are forbidden and debug annotations are dropped.
    Mandatory,
    /// Chosen by the optimizer. Any callee is permitted, debug
    /// annotations survive, and a fresh inline scope is recorded.
    Performance,
}

/// Positional name of a call site inside a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplySiteKind {
    /// Non-throwing `apply` at an instruction index
    Apply { index: usize },
    /// Throwing `try_apply`; always the block's terminator
    TryApply,
}

/// A call site: the function and block containing the call, and where in
/// the block the call sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplySite {
    pub function: IrFunctionId,
    pub block: IrBlockId,
    pub kind: ApplySiteKind,
}

impl ApplySite {
    pub fn apply(function: IrFunctionId, block: IrBlockId, index: usize) -> Self {
        Self {
            function,
            block,
            kind: ApplySiteKind::Apply { index },
        }
    }

    pub fn try_apply(function: IrFunctionId, block: IrBlockId) -> Self {
        Self {
            function,
            block,
            kind: ApplySiteKind::TryApply,
        }
    }
}

/// Per-site facts gathered before any mutation.
#[derive(Clone, Copy)]
enum SiteShape {
    Apply {
        index: usize,
        dest: Option<IrId>,
    },
    TryApply {
        normal: IrBlockId,
        error: IrBlockId,
    },
}

/// Inlines one callee into one caller, one call site at a time.
///
/// An instance is intended to be reused across many sites of the same
/// caller/callee pair; the remap tables are scratch state reset by every
/// [`Inliner::inline`] call.
pub struct Inliner {
    caller: IrFunctionId,
    callee: IrFunctionId,
    kind: InlineKind,
    /// Fallback scope when the call instruction carries none
    caller_scope: IrScopeId,

    /// callee value -> caller value, reset per call
    value_map: FxHashMap<IrId, IrId>,
    /// callee block -> caller block; ordered so terminator patching is
    /// deterministic. Reset per call.
    block_map: BTreeMap<IrBlockId, IrBlockId>,
    /// callee scope -> rebuilt caller scope, reset per call
    scope_cache: FxHashMap<IrScopeId, IrScopeId>,

    /// Root of the inlined-call-site chain for every cloned instruction
    call_site_scope: Option<IrScopeId>,
    /// Location stamped on synthesized branches and unreachables
    loc: IrLocation,
}

impl Inliner {
    pub fn new(
        caller: IrFunctionId,
        callee: IrFunctionId,
        kind: InlineKind,
        caller_scope: IrScopeId,
    ) -> Self {
        Self {
            caller,
            callee,
            kind,
            caller_scope,
            value_map: FxHashMap::default(),
            block_map: BTreeMap::new(),
            scope_cache: FxHashMap::default(),
            call_site_scope: None,
            loc: IrLocation::unknown(),
        }
    }

    /// Whether this inliner may process `site`. Self-inlining is the one
    /// thing ruled out here; visibility, recursion, and body availability
    /// are the policy layer's checks.
    pub fn can_inline(&self, site: &ApplySite) -> bool {
        site.function != self.callee
    }

    /// Splice the callee into the caller at `site`, binding `args` to the
    /// callee's entry parameters.
    ///
    /// # Panics
    ///
    /// Panics on violated preconditions: `can_inline` is false, `site` is
    /// not in this inliner's caller, `args` does not match the callee's
    /// entry parameter count, the site does not name an apply/try_apply,
    /// or a foreign callee is inlined under [`InlineKind::Mandatory`].
    /// There is no partial-success state.
    pub fn inline(&mut self, module: &mut IrModule, site: &ApplySite, args: &[IrId]) {
        assert!(
            self.can_inline(site),
            "cannot inline {} into itself",
            self.callee
        );
        assert_eq!(
            site.function, self.caller,
            "apply site is not in the inliner's caller"
        );

        // Snapshot the callee so the caller can be mutated freely.
        let callee_fn = module
            .functions
            .get(&self.callee)
            .expect("callee is not part of the module")
            .clone();

        if self.kind == InlineKind::Mandatory {
            assert_eq!(
                callee_fn.representation,
                FunctionRepresentation::Native,
                "mandatory inlining cannot consume a foreign callee"
            );
        }

        let entry_bb = callee_fn.entry_block();
        let entry_params: Vec<IrBlockParam> = callee_fn.entry_params().to_vec();
        assert_eq!(
            args.len(),
            entry_params.len(),
            "argument count does not match the callee's entry parameters"
        );

        // Site facts, copied out so no caller borrow outlives this block.
        let (shape, site_loc, site_scope, insert_before) = {
            let caller_fn = module
                .functions
                .get(&self.caller)
                .expect("caller is not part of the module");
            let block = caller_fn
                .cfg
                .get_block(site.block)
                .expect("apply site block is not in the caller");
            let (shape, loc, scope) = match site.kind {
                ApplySiteKind::Apply { index } => {
                    let inst = block
                        .instructions
                        .get(index)
                        .expect("apply site index is out of range");
                    match &inst.kind {
                        IrInstKind::Apply { dest, .. } => {
                            (SiteShape::Apply { index, dest: *dest }, inst.loc, inst.scope)
                        }
                        _ => panic!("apply site does not name an apply instruction"),
                    }
                }
                ApplySiteKind::TryApply => {
                    let term = block
                        .terminator
                        .as_ref()
                        .expect("apply site block has no terminator");
                    match &term.kind {
                        IrTermKind::TryApply { normal, error, .. } => (
                            SiteShape::TryApply {
                                normal: *normal,
                                error: *error,
                            },
                            term.loc,
                            term.scope,
                        ),
                        _ => panic!("apply site does not name a try_apply terminator"),
                    }
                }
            };
            (shape, loc, scope, caller_fn.cfg.block_after(site.block))
        };

        debug!(
            "inlining {} ({}) into {} at {} [{:?}]",
            callee_fn.name, self.callee, self.caller, site.block, self.kind
        );

        // Synthesized control flow reports the call's location, wrapped
        // for the flavor in effect.
        self.loc = match self.kind {
            InlineKind::Performance => site_loc.inlined(),
            InlineKind::Mandatory => site_loc.mandatory_inlined(),
        };

        // Call-site scope. Mandatory inlining pretends the cloned code was
        // written at the call; performance inlining records a fresh scope
        // chained into the caller's scope tree.
        let ai_scope = site_scope.unwrap_or(self.caller_scope);
        self.call_site_scope = Some(match self.kind {
            InlineKind::Mandatory => ai_scope,
            InlineKind::Performance => {
                let inherited = module.scopes.get(ai_scope).inlined_call_site;
                module.scopes.alloc(IrDebugScope {
                    loc: site_loc,
                    parent: Some(ScopeParent::Scope(ai_scope)),
                    inlined_call_site: inherited,
                })
            }
        });

        // Keep the callee's debug metadata alive until emission.
        module
            .functions
            .get_mut(&self.callee)
            .expect("callee is not part of the module")
            .has_been_inlined = true;

        self.value_map.clear();
        self.block_map.clear();
        self.scope_cache.clear();

        for (param, &arg) in entry_params.iter().zip(args) {
            self.value_map.insert(param.value, arg);
        }
        // The callee's entry block is not cloned; its instructions flow
        // into the caller's block at the call.
        self.block_map.insert(entry_bb, site.block);

        let caller_fn = module
            .functions
            .get_mut(&self.caller)
            .expect("caller is not part of the module");

        let order = callee_fn.cfg.depth_first_order();
        let mut entry_cloned = 0usize;
        let call_index = match shape {
            SiteShape::Apply { index, .. } => index,
            SiteShape::TryApply { .. } => {
                match caller_fn.cfg.get_block(site.block) {
                    Some(b) => b.instructions.len(),
                    None => 0,
                }
            }
        };

        for &bb in &order {
            let src_block = callee_fn
                .cfg
                .get_block(bb)
                .expect("callee cfg lost a block mid-walk");

            let target_bb = if bb == entry_bb {
                site.block
            } else {
                let new_bb = caller_fn.cfg.create_block_before(insert_before);
                for p in &src_block.params {
                    let fresh = caller_fn.alloc_reg();
                    self.value_map.insert(p.value, fresh);
                    caller_fn
                        .cfg
                        .get_block_mut(new_bb)
                        .expect("freshly created block is missing")
                        .params
                        .push(IrBlockParam {
                            value: fresh,
                            ty: p.ty.clone(),
                            ownership: p.ownership,
                        });
                }
                self.block_map.insert(bb, new_bb);
                new_bb
            };
            trace!("cloning callee {} into caller {}", bb, target_bb);

            for inst in &src_block.instructions {
                // A no-debug inlined callee: annotations do not survive
                // mandatory inlining.
                if self.kind == InlineKind::Mandatory && inst.kind.is_debug_annotation() {
                    continue;
                }

                let mut kind = inst.kind.clone();
                {
                    let vm = &self.value_map;
                    kind.for_each_operand_mut(&mut |v: &mut IrId| {
                        if v.is_valid() {
                            *v = *vm
                                .get(v)
                                .unwrap_or_else(|| panic!("callee value {} was never remapped", v));
                        }
                    });
                }
                if let Some(old_dest) = inst.kind.dest() {
                    let fresh = caller_fn.alloc_reg();
                    self.value_map.insert(old_dest, fresh);
                    kind.set_dest(fresh);
                }

                let scope = self.resolve_scope(&mut module.scopes, inst.scope);
                let cloned = IrInstruction {
                    kind,
                    loc: inst.loc,
                    scope: Some(scope),
                };

                let block = caller_fn
                    .cfg
                    .get_block_mut(target_bb)
                    .expect("clone target block is missing");
                if bb == entry_bb {
                    block.instructions.insert(call_index + entry_cloned, cloned);
                    entry_cloned += 1;
                } else {
                    block.instructions.push(cloned);
                }
            }
        }

        // Fast path: a single-block callee ending in a return fuses into
        // the caller with no split and no synthesized branch.
        let entry_term = callee_fn
            .cfg
            .get_block(entry_bb)
            .and_then(|b| b.terminator.as_ref())
            .expect("callee entry block has no terminator");
        if let SiteShape::Apply { dest, .. } = shape {
            if let IrTermKind::Return { value } = &entry_term.kind {
                if let (Some(dest), Some(v)) = (dest, value) {
                    let threaded = self.remap(*v);
                    caller_fn.replace_all_uses(dest, threaded);
                }
                debug!("single-block return fused without splitting");
                return;
            }
        }

        // The block every cloned return branches to. For a try_apply it
        // already exists; for an apply it is split off the caller block,
        // keeps the call and everything after it, and gains the result
        // parameter.
        let return_to = match shape {
            SiteShape::TryApply { normal, .. } => normal,
            SiteShape::Apply { index, dest } => {
                let tail = caller_fn.cfg.split_block(site.block, index + entry_cloned);
                caller_fn.cfg.move_block_before(tail, insert_before);
                if let Some(dest) = dest {
                    let result = caller_fn.alloc_reg();
                    caller_fn
                        .cfg
                        .get_block_mut(tail)
                        .expect("split tail block is missing")
                        .params
                        .push(IrBlockParam {
                            value: result,
                            ty: callee_fn.signature.return_type.clone(),
                            ownership: OwnershipKind::Owned,
                        });
                    caller_fn.replace_all_uses(dest, result);
                }
                tail
            }
        };

        let passes_result = match shape {
            SiteShape::Apply { dest, .. } => dest.is_some(),
            SiteShape::TryApply { .. } => true,
        };

        // Patch terminators now that every value and block is mapped.
        let pairs: Vec<(IrBlockId, IrBlockId)> =
            self.block_map.iter().map(|(&a, &b)| (a, b)).collect();
        for (callee_bb, caller_bb) in pairs {
            let term = callee_fn
                .cfg
                .get_block(callee_bb)
                .and_then(|b| b.terminator.as_ref())
                .expect("callee block has no terminator");

            let new_term = match &term.kind {
                IrTermKind::Return { value } => {
                    let mut branch_args = Vec::new();
                    if passes_result {
                        if let Some(v) = value {
                            branch_args.push(self.remap(*v));
                        }
                    }
                    IrTerminator {
                        kind: IrTermKind::Branch {
                            target: return_to,
                            args: branch_args,
                        },
                        loc: self.loc,
                        scope: Some(self.resolve_scope(&mut module.scopes, term.scope)),
                    }
                }
                IrTermKind::Throw { value } => match shape {
                    SiteShape::TryApply { error, .. } => IrTerminator {
                        kind: IrTermKind::Branch {
                            target: error,
                            args: vec![self.remap(*value)],
                        },
                        loc: self.loc,
                        scope: Some(self.resolve_scope(&mut module.scopes, term.scope)),
                    },
                    // A throw inside a non-throwing callee cannot execute;
                    // the front end guarantees it.
                    SiteShape::Apply { .. } => IrTerminator {
                        kind: IrTermKind::Unreachable,
                        loc: self.loc,
                        scope: Some(self.resolve_scope(&mut module.scopes, term.scope)),
                    },
                },
                other => {
                    let mut kind = other.clone();
                    {
                        let vm = &self.value_map;
                        kind.for_each_operand_mut(&mut |v: &mut IrId| {
                            if v.is_valid() {
                                *v = *vm.get(v).unwrap_or_else(|| {
                                    panic!("callee value {} was never remapped", v)
                                });
                            }
                        });
                    }
                    {
                        let bm = &self.block_map;
                        kind.for_each_successor_mut(&mut |b: &mut IrBlockId| {
                            *b = *bm
                                .get(b)
                                .unwrap_or_else(|| panic!("callee block {} was never cloned", b));
                        });
                    }
                    IrTerminator {
                        kind,
                        loc: term.loc,
                        scope: Some(self.resolve_scope(&mut module.scopes, term.scope)),
                    }
                }
            };

            caller_fn
                .cfg
                .get_block_mut(caller_bb)
                .expect("patched caller block is missing")
                .terminator = Some(new_term);
        }
    }

    fn remap(&self, v: IrId) -> IrId {
        if !v.is_valid() {
            return v;
        }
        *self
            .value_map
            .get(&v)
            .unwrap_or_else(|| panic!("callee value {} was never remapped", v))
    }

    /// Rebuild a callee scope on the caller side, memoized per call.
    ///
    /// The lexical parent is copied verbatim (the clone keeps pointing at
    /// the callee's scope tree), while the inlined-at chain is rewritten
    /// so its root is the call-site scope.
    fn resolve_scope(
        &mut self,
        scopes: &mut IrScopeArena,
        scope: Option<IrScopeId>,
    ) -> IrScopeId {
        let Some(s) = scope else {
            return self
                .call_site_scope
                .expect("scope resolution outside of an inline operation");
        };
        if let Some(&cached) = self.scope_cache.get(&s) {
            return cached;
        }
        let original = scopes.get(s).clone();
        let inlined_at = self.resolve_scope(scopes, original.inlined_call_site);
        let fresh = scopes.alloc(IrDebugScope {
            loc: original.loc,
            parent: original.parent,
            inlined_call_site: Some(inlined_at),
        });
        self.scope_cache.insert(s, fresh);
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        function_code_growth, validate_function, IrBuilder, IrType, LocationKind,
    };
    use crate::logging;

    /// fn id(x: Int32) -> Int32 { return x }
    fn build_identity_callee(b: &mut IrBuilder) -> IrFunctionId {
        let f = b
            .begin_function("id")
            .param("x", IrType::I32)
            .returns(IrType::I32)
            .build();
        b.set_current_function(f);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let x = b.get_param(0);
        b.ret(Some(x));
        f
    }

    /// fn two(x: Int32) -> Int32 { bb0: br bb1(x)  bb1(y): return y }
    fn build_two_block_callee(b: &mut IrBuilder) -> IrFunctionId {
        let f = b
            .begin_function("two")
            .param("x", IrType::I32)
            .returns(IrType::I32)
            .build();
        b.set_current_function(f);
        let bb0 = b.create_block("bb0");
        let bb1 = b.create_block("bb1");
        let y = b.add_block_param(bb1, IrType::I32, OwnershipKind::Trivial);
        b.set_insert_point(bb0);
        let x = b.get_param(0);
        b.br(bb1, vec![x]);
        b.set_insert_point(bb1);
        b.ret(Some(y));
        f
    }

    /// fn thrower() throws -> Int32 { e = integer_literal 7; throw e }
    fn build_throwing_callee(b: &mut IrBuilder) -> IrFunctionId {
        let f = b
            .begin_function("thrower")
            .returns(IrType::I32)
            .throws()
            .build();
        b.set_current_function(f);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let e = b.integer_literal(IrType::I64, 7);
        b.throw(e);
        f
    }

    /// Caller with `dest = apply callee(caller_param)` followed by
    /// `return dest`. Returns (caller, site, arg, call dest).
    fn build_apply_caller(
        b: &mut IrBuilder,
        callee: IrFunctionId,
    ) -> (IrFunctionId, ApplySite, IrId, IrId) {
        let caller = b
            .begin_function("caller")
            .param("a", IrType::I32)
            .returns(IrType::I32)
            .build();
        b.set_current_function(caller);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let a = b.get_param(0);
        let f = b.function_ref(callee);
        let z = b.apply(f, vec![a]);
        b.ret(Some(z));
        (caller, ApplySite::apply(caller, entry, 1), a, z)
    }

    #[test]
    fn test_leaf_identity_fast_path() {
        logging::init_test();
        let mut b = IrBuilder::new("m");
        let callee = build_identity_callee(&mut b);
        let (caller, site, a, z) = build_apply_caller(&mut b, callee);
        let mut module = b.finish();

        let caller_scope = module.function(caller).unwrap().scope;
        let mut inliner = Inliner::new(caller, callee, InlineKind::Performance, caller_scope);
        assert!(inliner.can_inline(&site));
        inliner.inline(&mut module, &site, &[a]);

        let f = module.function(caller).unwrap();
        // No new blocks, no split
        assert_eq!(f.cfg.block_order.len(), 1);
        let entry = f.cfg.get_block(site.block).unwrap();
        // The call instruction is still present for the policy to delete
        assert!(matches!(
            entry.instructions[1].kind,
            IrInstKind::Apply { .. }
        ));
        // Every use of the call result now names the argument
        assert_eq!(
            entry.terminator.as_ref().unwrap().kind.uses().as_slice(),
            &[a]
        );
        assert_ne!(
            entry.terminator.as_ref().unwrap().kind.uses().as_slice(),
            &[z]
        );
        // The callee is marked as having been inlined somewhere
        assert!(module.function(callee).unwrap().has_been_inlined);
        validate_function(module.function(caller).unwrap()).unwrap();
    }

    #[test]
    fn test_two_block_callee_splits_and_threads() {
        logging::init_test();
        let mut b = IrBuilder::new("m");
        let callee = build_two_block_callee(&mut b);
        let (caller, site, a, _z) = build_apply_caller(&mut b, callee);
        let mut module = b.finish();

        let caller_scope = module.function(caller).unwrap().scope;
        let mut inliner = Inliner::new(caller, callee, InlineKind::Performance, caller_scope);
        inliner.inline(&mut module, &site, &[a]);

        let f = module.function(caller).unwrap();
        // entry + cloned bb1 + return-to tail
        assert_eq!(f.cfg.block_order.len(), 3);
        let (entry_id, cloned_id, tail_id) = (
            f.cfg.block_order[0],
            f.cfg.block_order[1],
            f.cfg.block_order[2],
        );
        assert_eq!(entry_id, site.block);

        // Entry now ends in the cloned callee branch, passing the argument
        let entry = f.cfg.get_block(entry_id).unwrap();
        match &entry.terminator.as_ref().unwrap().kind {
            IrTermKind::Branch { target, args } => {
                assert_eq!(*target, cloned_id);
                assert_eq!(args.as_slice(), &[a]);
            }
            other => panic!("expected branch into the cloned body, got {:?}", other),
        }

        // The cloned block returns by branching to the tail
        let cloned = f.cfg.get_block(cloned_id).unwrap();
        assert_eq!(cloned.params.len(), 1);
        let y = cloned.params[0].value;
        match &cloned.terminator.as_ref().unwrap().kind {
            IrTermKind::Branch { target, args } => {
                assert_eq!(*target, tail_id);
                assert_eq!(args.as_slice(), &[y]);
            }
            other => panic!("expected branch to the return block, got {:?}", other),
        }
        // Synthesized branch carries the wrapped call location
        assert_eq!(
            cloned.terminator.as_ref().unwrap().loc.kind,
            LocationKind::Inlined
        );

        // The tail holds the original call, one Owned result parameter,
        // and returns it
        let tail = f.cfg.get_block(tail_id).unwrap();
        assert_eq!(tail.params.len(), 1);
        assert_eq!(tail.params[0].ownership, OwnershipKind::Owned);
        assert_eq!(tail.params[0].ty, IrType::I32);
        assert!(matches!(tail.instructions[0].kind, IrInstKind::Apply { .. }));
        assert_eq!(
            tail.terminator.as_ref().unwrap().kind.uses().as_slice(),
            &[tail.params[0].value]
        );

        validate_function(f).unwrap();
    }

    #[test]
    fn test_throwing_callee_under_try_apply() {
        logging::init_test();
        let mut b = IrBuilder::new("m");
        let callee = build_throwing_callee(&mut b);

        let caller = b.begin_function("caller").returns(IrType::I32).build();
        b.set_current_function(caller);
        let entry = b.create_block("entry");
        let normal = b.create_block("normal");
        let r = b.add_block_param(normal, IrType::I32, OwnershipKind::Owned);
        let error = b.create_block("error");
        let q = b.add_block_param(error, IrType::I64, OwnershipKind::Owned);
        b.set_insert_point(entry);
        let f = b.function_ref(callee);
        b.try_apply(f, vec![], normal, error);
        b.set_insert_point(normal);
        b.ret(Some(r));
        b.set_insert_point(error);
        let _ = q;
        b.unreachable();

        let mut module = b.finish();
        let site = ApplySite::try_apply(caller, entry);
        let caller_scope = module.function(caller).unwrap().scope;
        let mut inliner = Inliner::new(caller, callee, InlineKind::Performance, caller_scope);
        inliner.inline(&mut module, &site, &[]);

        let func = module.function(caller).unwrap();
        // Single-block callee: no blocks were added
        assert_eq!(func.cfg.block_order.len(), 3);

        let entry_block = func.cfg.get_block(entry).unwrap();
        // The cloned literal was appended behind the function_ref
        assert!(matches!(
            entry_block.instructions[1].kind,
            IrInstKind::IntegerLiteral { .. }
        ));
        let thrown = entry_block.instructions[1].kind.dest().unwrap();

        // The try_apply became a branch to the error successor with the
        // remapped thrown value
        match &entry_block.terminator.as_ref().unwrap().kind {
            IrTermKind::Branch { target, args } => {
                assert_eq!(*target, error);
                assert_eq!(args.as_slice(), &[thrown]);
            }
            other => panic!("expected branch to the error block, got {:?}", other),
        }

        // The normal successor lost its predecessor but was not removed
        assert!(func.cfg.get_block(normal).is_some());
        assert!(func.cfg.predecessors_of(normal).is_empty());
        validate_function(func).unwrap();
    }

    #[test]
    fn test_throw_under_plain_apply_becomes_unreachable() {
        logging::init_test();
        let mut b = IrBuilder::new("m");
        let callee = build_throwing_callee(&mut b);

        let caller = b.begin_function("caller").returns(IrType::I32).build();
        b.set_current_function(caller);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let f = b.function_ref(callee);
        let z = b.apply(f, vec![]);
        b.ret(Some(z));

        let mut module = b.finish();
        let site = ApplySite::apply(caller, entry, 1);
        let caller_scope = module.function(caller).unwrap().scope;
        let mut inliner = Inliner::new(caller, callee, InlineKind::Mandatory, caller_scope);
        inliner.inline(&mut module, &site, &[]);

        let func = module.function(caller).unwrap();
        let entry_block = func.cfg.get_block(entry).unwrap();
        let term = entry_block.terminator.as_ref().unwrap();
        assert!(matches!(term.kind, IrTermKind::Unreachable));
        assert_eq!(term.loc.kind, LocationKind::MandatoryInlined);

        // The split still produced the dead tail holding the call
        assert_eq!(func.cfg.block_order.len(), 2);
        let tail = func.cfg.get_block(func.cfg.block_order[1]).unwrap();
        assert!(matches!(tail.instructions[0].kind, IrInstKind::Apply { .. }));
        assert!(func.cfg.predecessors_of(func.cfg.block_order[1]).is_empty());
        validate_function(func).unwrap();
    }

    #[test]
    fn test_multiple_returns_share_the_return_block() {
        logging::init_test();
        let mut b = IrBuilder::new("m");

        // fn pick(c: Bool) -> Int32 { bb0: cond_br c, bb1, bb2
        //   bb1: return 1  bb2: return 2 }
        let callee = b
            .begin_function("pick")
            .param("c", IrType::Bool)
            .returns(IrType::I32)
            .build();
        b.set_current_function(callee);
        let bb0 = b.create_block("bb0");
        let bb1 = b.create_block("bb1");
        let bb2 = b.create_block("bb2");
        b.set_insert_point(bb0);
        let c = b.get_param(0);
        b.cond_br(c, bb1, vec![], bb2, vec![]);
        b.set_insert_point(bb1);
        let one = b.integer_literal(IrType::I32, 1);
        b.ret(Some(one));
        b.set_insert_point(bb2);
        let two = b.integer_literal(IrType::I32, 2);
        b.ret(Some(two));

        let caller = b
            .begin_function("caller")
            .param("c", IrType::Bool)
            .returns(IrType::I32)
            .build();
        b.set_current_function(caller);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let arg = b.get_param(0);
        let f = b.function_ref(callee);
        let z = b.apply(f, vec![arg]);
        b.ret(Some(z));

        let mut module = b.finish();
        let site = ApplySite::apply(caller, entry, 1);
        let caller_scope = module.function(caller).unwrap().scope;
        let mut inliner = Inliner::new(caller, callee, InlineKind::Performance, caller_scope);
        inliner.inline(&mut module, &site, &[arg]);

        let func = module.function(caller).unwrap();
        // entry + two cloned blocks + tail
        assert_eq!(func.cfg.block_order.len(), 4);
        let tail_id = *func.cfg.block_order.last().unwrap();
        let preds = func.cfg.predecessors_of(tail_id);
        assert_eq!(preds.len(), 2);
        for pred in preds {
            match &func.cfg.get_block(pred).unwrap().terminator.as_ref().unwrap().kind {
                IrTermKind::Branch { target, args } => {
                    assert_eq!(*target, tail_id);
                    assert_eq!(args.len(), 1);
                }
                other => panic!("expected return branch, got {:?}", other),
            }
        }
        validate_function(func).unwrap();
    }

    /// fn traced(x: Int32) -> Int32, with debug_value annotations in both
    /// of its blocks.
    fn build_annotated_callee(b: &mut IrBuilder) -> IrFunctionId {
        let f = b
            .begin_function("traced")
            .param("x", IrType::I32)
            .returns(IrType::I32)
            .build();
        b.set_current_function(f);
        let bb0 = b.create_block("bb0");
        let exit = b.create_block("exit");
        let y = b.add_block_param(exit, IrType::I32, OwnershipKind::Trivial);
        b.set_insert_point(bb0);
        let x = b.get_param(0);
        b.debug_value(x, "x");
        b.br(exit, vec![x]);
        b.set_insert_point(exit);
        b.debug_value(y, "y");
        b.ret(Some(y));
        f
    }

    fn inlined_debug_annotation_count(kind: InlineKind) -> usize {
        let mut b = IrBuilder::new("m");
        let callee = build_annotated_callee(&mut b);
        let (caller, site, a, _z) = build_apply_caller(&mut b, callee);
        let mut module = b.finish();
        let caller_scope = module.function(caller).unwrap().scope;
        Inliner::new(caller, callee, kind, caller_scope).inline(&mut module, &site, &[a]);

        let func = module.function(caller).unwrap();
        validate_function(func).unwrap();
        func.cfg
            .blocks
            .values()
            .flat_map(|block| &block.instructions)
            .filter(|inst| inst.kind.is_debug_annotation())
            .count()
    }

    #[test]
    fn test_mandatory_inlining_drops_debug_annotations() {
        logging::init_test();
        assert_eq!(inlined_debug_annotation_count(InlineKind::Mandatory), 0);
        assert_eq!(inlined_debug_annotation_count(InlineKind::Performance), 2);
    }

    #[test]
    fn test_performance_scope_chain_nests_one_level_per_inline() {
        logging::init_test();
        let mut b = IrBuilder::new("m");

        // g: fn g() -> Int32 { return 41 }
        let g = b.begin_function("g").returns(IrType::I32).build();
        b.set_current_function(g);
        let g_entry = b.create_block("entry");
        b.set_insert_point(g_entry);
        let lit = b.integer_literal(IrType::I32, 41);
        b.ret(Some(lit));

        // f: fn f() -> Int32 { v = apply g(); return v }
        let f = b.begin_function("f").returns(IrType::I32).build();
        b.set_current_function(f);
        let f_entry = b.create_block("entry");
        b.set_insert_point(f_entry);
        let gr = b.function_ref(g);
        let v = b.apply(gr, vec![]);
        b.ret(Some(v));

        // h: fn h() -> Int32 { w = apply f(); return w }
        let h = b.begin_function("h").returns(IrType::I32).build();
        b.set_current_function(h);
        let h_entry = b.create_block("entry");
        b.set_insert_point(h_entry);
        let fr = b.function_ref(f);
        let w = b.apply(fr, vec![]);
        b.ret(Some(w));

        let mut module = b.finish();
        let f_scope = module.function(f).unwrap().scope;
        let h_scope = module.function(h).unwrap().scope;
        let g_id = g;

        // First: inline g into f (performance)
        let site_in_f = ApplySite::apply(f, f_entry, 1);
        Inliner::new(f, g, InlineKind::Performance, f_scope).inline(
            &mut module,
            &site_in_f,
            &[],
        );

        // Then: inline f into h (performance)
        let site_in_h = ApplySite::apply(h, h_entry, 1);
        Inliner::new(h, f, InlineKind::Performance, h_scope).inline(
            &mut module,
            &site_in_h,
            &[],
        );

        // Find the literal that originated in g, now living in h
        let func_h = module.function(h).unwrap();
        let entry = func_h.cfg.get_block(h_entry).unwrap();
        let lit_inst = entry
            .instructions
            .iter()
            .find(|i| matches!(i.kind, IrInstKind::IntegerLiteral { .. }))
            .expect("the literal from g should have reached h");

        let scope = lit_inst.scope.expect("cloned instruction lost its scope");
        // Lexical chain still mirrors g's scope tree
        assert_eq!(
            module.scopes.get(scope).parent,
            Some(ScopeParent::Function(g_id))
        );

        // Inlined-at chain: call-site-in-f first, call-site-in-h at the root
        let chain = module.scopes.inlined_at_chain(scope);
        assert_eq!(chain.len(), 2);
        assert_eq!(
            module.scopes.get(chain[0]).parent,
            Some(ScopeParent::Scope(f_scope))
        );
        assert_eq!(
            module.scopes.get(chain[1]).parent,
            Some(ScopeParent::Scope(h_scope))
        );
    }

    #[test]
    fn test_inliner_instance_reuse_across_sites() {
        logging::init_test();
        let mut b = IrBuilder::new("m");
        let callee = build_identity_callee(&mut b);

        let caller = b
            .begin_function("caller")
            .param("a", IrType::I32)
            .returns(IrType::I32)
            .build();
        b.set_current_function(caller);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let a = b.get_param(0);
        let f = b.function_ref(callee);
        let z1 = b.apply(f, vec![a]);
        let z2 = b.apply(f, vec![z1]);
        b.ret(Some(z2));

        let mut module = b.finish();
        let caller_scope = module.function(caller).unwrap().scope;
        let mut inliner = Inliner::new(caller, callee, InlineKind::Performance, caller_scope);

        inliner.inline(&mut module, &ApplySite::apply(caller, entry, 1), &[a]);
        // After the first fuse, the second apply's argument is already `a`
        let second_args = {
            let func = module.function(caller).unwrap();
            func.cfg.get_block(entry).unwrap().instructions[2]
                .kind
                .uses()
        };
        assert_eq!(second_args[1], a);
        inliner.inline(&mut module, &ApplySite::apply(caller, entry, 2), &[a]);

        let func = module.function(caller).unwrap();
        assert_eq!(
            func.cfg
                .get_block(entry)
                .unwrap()
                .terminator
                .as_ref()
                .unwrap()
                .kind
                .uses()
                .as_slice(),
            &[a]
        );
        validate_function(func).unwrap();
    }

    #[test]
    fn test_value_isolation_after_inlining() {
        logging::init_test();
        let mut b = IrBuilder::new("m");
        let callee = build_two_block_callee(&mut b);

        let caller = b
            .begin_function("caller")
            .param("a", IrType::I32)
            .returns(IrType::I32)
            .build();
        // Push the caller's value ids far away from the callee's so any
        // escaped callee id is detectable.
        b.module_mut().function_mut(caller).unwrap().next_reg_id = 1000;
        b.set_current_function(caller);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let a = b.get_param(0);
        let f = b.function_ref(callee);
        let z = b.apply(f, vec![a]);
        b.ret(Some(z));

        // Values defined by the callee, before inlining
        let callee_values: Vec<IrId> = {
            let func = b.module().function(callee).unwrap();
            let mut vs: Vec<IrId> = func.entry_params().iter().map(|p| p.value).collect();
            for block in func.cfg.blocks.values() {
                vs.extend(block.params.iter().map(|p| p.value));
                for inst in &block.instructions {
                    vs.extend(inst.kind.dest());
                }
            }
            vs
        };

        let mut module = b.finish();
        let site = ApplySite::apply(caller, entry, 1);
        let caller_scope = module.function(caller).unwrap().scope;
        Inliner::new(caller, callee, InlineKind::Performance, caller_scope).inline(
            &mut module,
            &site,
            &[a],
        );

        let func = module.function(caller).unwrap();
        validate_function(func).unwrap();
        for block_id in &func.cfg.block_order {
            let block = func.cfg.get_block(*block_id).unwrap();
            for inst in &block.instructions {
                for used in inst.kind.uses() {
                    assert!(
                        !callee_values.contains(&used) || used == a,
                        "callee value {} leaked into the caller",
                        used
                    );
                }
            }
            if let Some(term) = &block.terminator {
                for used in term.kind.uses() {
                    assert!(
                        !callee_values.contains(&used) || used == a,
                        "callee value {} leaked into the caller",
                        used
                    );
                }
            }
        }
    }

    #[test]
    fn test_can_inline_rejects_self_inlining() {
        let mut b = IrBuilder::new("m");
        let callee = build_identity_callee(&mut b);
        let module = b.finish();
        let scope = module.function(callee).unwrap().scope;

        let inliner = Inliner::new(callee, callee, InlineKind::Performance, scope);
        let entry = module.function(callee).unwrap().entry_block();
        assert!(!inliner.can_inline(&ApplySite::apply(callee, entry, 0)));
    }

    #[test]
    #[should_panic(expected = "foreign callee")]
    fn test_mandatory_inlining_rejects_foreign_callees() {
        let mut b = IrBuilder::new("m");
        let callee = b
            .begin_function("imported")
            .param("x", IrType::I32)
            .returns(IrType::I32)
            .representation(FunctionRepresentation::ForeignC)
            .build();
        b.set_current_function(callee);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let x = b.get_param(0);
        b.ret(Some(x));

        let (caller, site, a, _z) = build_apply_caller(&mut b, callee);
        let mut module = b.finish();
        let caller_scope = module.function(caller).unwrap().scope;
        Inliner::new(caller, callee, InlineKind::Mandatory, caller_scope).inline(
            &mut module,
            &site,
            &[a],
        );
    }

    #[test]
    #[should_panic(expected = "argument count")]
    fn test_argument_count_mismatch_panics() {
        let mut b = IrBuilder::new("m");
        let callee = build_identity_callee(&mut b);
        let (caller, site, _a, _z) = build_apply_caller(&mut b, callee);
        let mut module = b.finish();
        let caller_scope = module.function(caller).unwrap().scope;
        Inliner::new(caller, callee, InlineKind::Performance, caller_scope).inline(
            &mut module,
            &site,
            &[],
        );
    }

    #[test]
    fn test_code_growth_estimate() {
        let mut b = IrBuilder::new("m");
        let f = b
            .begin_function("mixed")
            .param("p", IrType::address_of(IrType::I32))
            .returns(IrType::I32)
            .build();
        b.set_current_function(f);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let p = b.get_param(0);
        let lit = b.integer_literal(IrType::I32, 3); // free
        let loaded = b.load(p, IrType::I32); // expensive
        b.store(lit, p); // expensive
        b.ret(Some(loaded)); // free

        let module = b.finish();
        assert_eq!(function_code_growth(module.function(f).unwrap()), 2);
    }
}
