//! Predicate compilation.
//!
//! [`PredicateCompiler`] dispatches one predicate to exactly one builder
//! support. [`LoweredPredicate`] wraps that support in the
//! prepare / build-joins / build-predicate-commands lifecycle the enclosing
//! query builder drives, and [`QueryCompiler`] drives it for every predicate of
//! a query against shared join and fragment accumulators.

use std::hash::Hasher;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use xxhash_rust::xxh64::Xxh64;

use crate::catalog::FixedTenant;
use crate::config::{CompilerOptions, ConfigError};
use crate::query::ast::{Predicate, PropertyArg, Selector, SpecialProperty};
use crate::query::errors::CompileError;
use crate::query::fragments::{PredicateAssembler, PredicateFragment, PredicateMode};
use crate::query::joins::{JoinCommand, JoinPlanner, SingleJoins};
use crate::query::resolver::{Collaborators, IdentifierResolver, PropertyKind};
use crate::query::support::{
    BuilderSupport, ObjectIdentityMembership, Operand, ParentMembership, PredicateSupport,
    PropertyComparison, TypeIdentityMembership,
};

/// Per-query inputs of predicate compilation.
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    /// Identifier resolution.
    pub resolver: &'a IdentifierResolver,
    /// Storage layout flag; `false` selects the legacy layout.
    pub support_boolean_float_double: bool,
    /// Largest accepted membership list.
    pub max_in_list: usize,
}

/// Dispatches predicates to builder supports.
pub struct PredicateCompiler;

impl PredicateCompiler {
    /// Lowers `predicate` into its builder support. Emits no joins or fragments.
    pub fn compile(
        ctx: &CompileContext<'_>,
        predicate: &Predicate,
        active_selectors: &[Selector],
    ) -> Result<BuilderSupport, CompileError> {
        let (property, operand, mode) = match predicate {
            Predicate::ChildOf { parent, selector } => {
                let selector = require_selector(selector.as_ref(), active_selectors)?;
                let support = ParentMembership::child_of(ctx.resolver, parent, selector)?;
                return Ok(BuilderSupport::ParentMembership(support));
            }
            Predicate::SetMembership {
                property,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return Err(CompileError::InListEmpty {
                        prop: property.name.name().to_owned(),
                    });
                }
                if values.len() > ctx.max_in_list {
                    return Err(CompileError::InListTooLarge {
                        max: ctx.max_in_list,
                    });
                }
                (
                    property,
                    Operand::Values(values),
                    PredicateMode::In.negate_if(*negated),
                )
            }
            Predicate::PatternMatch {
                property,
                pattern,
                negated,
            } => (
                property,
                Operand::Pattern(pattern),
                PredicateMode::Like.negate_if(*negated),
            ),
            Predicate::Comparison {
                property,
                op,
                value,
            } => (
                property,
                Operand::Values(std::slice::from_ref(value)),
                PredicateMode::from_comparison(*op),
            ),
            Predicate::Exists { property, negated } => (
                property,
                Operand::Absent,
                PredicateMode::IsNotNull.negate_if(*negated),
            ),
        };
        lower_property(ctx, predicate.function_name(), property, operand, mode, active_selectors)
    }
}

/// Resolves the selector of a child-of test.
fn require_selector(
    explicit: Option<&Selector>,
    active: &[Selector],
) -> Result<Selector, CompileError> {
    match explicit {
        Some(selector) if active.contains(selector) => Ok(selector.clone()),
        Some(selector) => Err(CompileError::UnknownSelector {
            selector: selector.0.clone(),
        }),
        None => match active {
            [only] => Ok(only.clone()),
            _ => Err(CompileError::SelectorRequired {
                predicate: "child_of",
                active: active.len(),
            }),
        },
    }
}

/// Resolves the selector of a property predicate; ambiguity is left to the caller.
fn property_selector(
    explicit: Option<&Selector>,
    active: &[Selector],
) -> Result<Option<Selector>, CompileError> {
    match explicit {
        Some(selector) if active.contains(selector) => Ok(Some(selector.clone())),
        Some(selector) => Err(CompileError::UnknownSelector {
            selector: selector.0.clone(),
        }),
        None => Ok(match active {
            [only] => Some(only.clone()),
            _ => None,
        }),
    }
}

fn lower_property(
    ctx: &CompileContext<'_>,
    function: &'static str,
    property: &PropertyArg,
    operand: Operand<'_>,
    mode: PredicateMode,
    active_selectors: &[Selector],
) -> Result<BuilderSupport, CompileError> {
    let selector = property_selector(property.selector.as_ref(), active_selectors)?;
    let resolver = ctx.resolver;
    let kind = resolver.classify(&property.name)?;
    let unsupported = || CompileError::unsupported(function, property.name.name());
    let identity_mode = matches!(
        mode,
        PredicateMode::Equals | PredicateMode::NotEquals | PredicateMode::In | PredicateMode::NotIn
    );
    trace!(function, property = %property.name, ?kind, ?mode, "compiler.dispatch");
    let support = match &kind {
        PropertyKind::ParentId => {
            if !identity_mode && !matches!(operand, Operand::Absent) {
                return Err(unsupported());
            }
            BuilderSupport::ParentMembership(ParentMembership::prepare(
                resolver, selector, operand, mode,
            )?)
        }
        PropertyKind::ObjectId => {
            let pattern = matches!(mode, PredicateMode::Like | PredicateMode::NotLike);
            if !identity_mode && !pattern {
                return Err(unsupported());
            }
            BuilderSupport::ObjectIdentityMembership(ObjectIdentityMembership::prepare(
                resolver, selector, operand, mode,
            )?)
        }
        PropertyKind::ObjectTypeId | PropertyKind::BaseTypeId => {
            let Operand::Values(values) = operand else {
                return Err(unsupported());
            };
            if !identity_mode {
                return Err(unsupported());
            }
            let include_subtypes = kind == PropertyKind::ObjectTypeId;
            BuilderSupport::TypeIdentityMembership(TypeIdentityMembership::prepare(
                resolver,
                selector,
                property.name.name(),
                values,
                include_subtypes,
                mode,
            )?)
        }
        PropertyKind::ContentMimetype => {
            let resolved = resolver.resolve_content_property(SpecialProperty::ContentMimetype)?;
            BuilderSupport::PropertyComparison(PropertyComparison::prepare(
                resolver, resolved, selector, operand, mode,
            )?)
        }
        PropertyKind::ContentLength => {
            if matches!(operand, Operand::Pattern(_)) {
                return Err(unsupported());
            }
            let resolved = resolver.resolve_content_property(SpecialProperty::ContentLength)?;
            BuilderSupport::PropertyComparison(PropertyComparison::prepare(
                resolver, resolved, selector, operand, mode,
            )?)
        }
        PropertyKind::Generic(qname) => {
            let resolved = resolver.resolve_property(qname, ctx.support_boolean_float_double)?;
            BuilderSupport::PropertyComparison(PropertyComparison::prepare(
                resolver, resolved, selector, operand, mode,
            )?)
        }
    };
    Ok(support)
}

/// One predicate moving through prepare, build-joins and build-predicate-commands.
#[derive(Clone, Debug)]
pub struct LoweredPredicate {
    predicate: Predicate,
    support: Option<BuilderSupport>,
    alias: Option<String>,
}

impl LoweredPredicate {
    /// Wraps a predicate awaiting [`Self::prepare`].
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            support: None,
            alias: None,
        }
    }

    /// Whether this compiler can lower the predicate; true for every predicate kind.
    pub fn is_supported(&self) -> bool {
        matches!(
            self.predicate,
            Predicate::ChildOf { .. }
                | Predicate::SetMembership { .. }
                | Predicate::PatternMatch { .. }
                | Predicate::Comparison { .. }
                | Predicate::Exists { .. }
        )
    }

    /// Binds arguments, resolves identifiers and stores the builder support.
    pub fn prepare(
        &mut self,
        ctx: &CompileContext<'_>,
        active_selectors: &[Selector],
    ) -> Result<(), CompileError> {
        let support = PredicateCompiler::compile(ctx, &self.predicate, active_selectors)?;
        debug!(
            function = self.predicate.function_name(),
            strategy = support.strategy(),
            mode = ?support.mode(),
            "compiler.prepared"
        );
        self.support = Some(support);
        Ok(())
    }

    /// Adds the predicate's join requirement. No-op before [`Self::prepare`].
    pub fn build_joins(
        &mut self,
        single_joins: &mut SingleJoins,
        multi_joins: &mut Vec<JoinCommand>,
    ) {
        if let Some(support) = &self.support {
            self.alias = support.build_joins(single_joins, multi_joins);
        }
    }

    /// Appends the predicate's fragment. No-op before [`Self::prepare`].
    pub fn build_predicate_commands(&self, fragments: &mut Vec<PredicateFragment>) {
        if let Some(support) = &self.support {
            support.build_predicate_commands(self.alias.as_deref(), fragments);
        }
    }

    /// Source predicate.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Builder support, once prepared.
    pub fn support(&self) -> Option<&BuilderSupport> {
        self.support.as_ref()
    }

    /// Join alias the fragment filters through, once joins are built.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

/// Query submitted for compilation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Active selectors.
    pub selectors: Vec<Selector>,
    /// Predicates, conjoined in order.
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    /// Per-query storage layout override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_boolean_float_double: Option<bool>,
}

impl Query {
    /// Query over the given selectors.
    pub fn new<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        Self {
            selectors: selectors.into_iter().map(Into::into).collect(),
            predicates: Vec::new(),
            support_boolean_float_double: None,
        }
    }

    /// Appends a predicate.
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Overrides the storage layout flag.
    pub fn with_legacy_layout(mut self, legacy: bool) -> Self {
        self.support_boolean_float_double = Some(!legacy);
        self
    }
}

/// Join plan and fragments of one compiled query.
#[derive(Clone, Debug, Serialize)]
pub struct CompiledQuery {
    /// Active selectors.
    pub selectors: Vec<Selector>,
    /// Deduplicated joins, first-use order.
    pub single_joins: SingleJoins,
    /// Per-predicate joins.
    pub multi_joins: Vec<JoinCommand>,
    /// Fragments in predicate order.
    pub fragments: Vec<PredicateFragment>,
    /// Strategy chosen for each predicate.
    pub strategies: Vec<&'static str>,
    /// Deterministic hash of the plan.
    pub plan_hash: u64,
}

/// Compiles whole queries against one resolver.
pub struct QueryCompiler {
    resolver: Arc<IdentifierResolver>,
    options: CompilerOptions,
}

impl QueryCompiler {
    /// Creates a compiler over an existing resolver.
    pub fn new(resolver: Arc<IdentifierResolver>, options: CompilerOptions) -> Self {
        Self { resolver, options }
    }

    /// Builds the resolver from `collaborators` as configured by `options`.
    ///
    /// `default_tenant` only applies when the collaborators carry no tenant of their own.
    pub fn open(
        collaborators: Collaborators,
        options: CompilerOptions,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        let collaborators = match (&options.default_tenant, collaborators.tenant.current_domain()) {
            (Some(domain), None) => {
                collaborators.with_tenant(Arc::new(FixedTenant(Some(domain.clone()))))
            }
            _ => collaborators,
        };
        let resolver = IdentifierResolver::new(collaborators, options.resolver_options())
            .with_expansion(options.expansion_policy()?);
        Ok(Self::new(Arc::new(resolver), options))
    }

    /// Shared resolver.
    pub fn resolver(&self) -> &Arc<IdentifierResolver> {
        &self.resolver
    }

    /// Active options.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compiles every predicate in order. Fail-fast: on error nothing is returned.
    pub fn compile(&self, query: &Query) -> Result<CompiledQuery, CompileError> {
        let ctx = CompileContext {
            resolver: &self.resolver,
            support_boolean_float_double: query
                .support_boolean_float_double
                .unwrap_or(self.options.support_boolean_float_double),
            max_in_list: self.options.max_in_list,
        };
        let mut planner = JoinPlanner::new();
        let mut assembler = PredicateAssembler::new();
        let mut strategies = Vec::with_capacity(query.predicates.len());
        for (idx, predicate) in query.predicates.iter().enumerate() {
            let mut lowered = LoweredPredicate::new(predicate.clone());
            if !lowered.is_supported() {
                continue;
            }
            if let Err(err) = lowered.prepare(&ctx, &query.selectors) {
                warn!(predicate = idx, code = err.code(), error = %err, "compiler.failed");
                return Err(err);
            }
            lowered.build_joins(&mut planner.single_joins, &mut planner.multi_joins);
            lowered.build_predicate_commands(&mut assembler.fragments);
            if let Some(support) = lowered.support() {
                strategies.push(support.strategy());
            }
        }
        let plan_hash = plan_hash(&planner, &assembler.fragments, ctx.support_boolean_float_double);
        debug!(
            predicates = query.predicates.len(),
            single_joins = planner.single_joins.len(),
            multi_joins = planner.multi_joins.len(),
            plan_hash,
            "compiler.compiled"
        );
        Ok(CompiledQuery {
            selectors: query.selectors.clone(),
            single_joins: planner.single_joins,
            multi_joins: planner.multi_joins,
            fragments: assembler.fragments,
            strategies,
            plan_hash,
        })
    }
}

fn plan_hash(planner: &JoinPlanner, fragments: &[PredicateFragment], layout: bool) -> u64 {
    let mut hasher = Xxh64::new(0);
    hasher.write_u8(layout as u8);
    hasher.write_u64(planner.single_joins.len() as u64);
    for join in planner.single_joins.iter() {
        hash_join(&mut hasher, join);
    }
    hasher.write_u64(planner.multi_joins.len() as u64);
    for join in &planner.multi_joins {
        hash_join(&mut hasher, join);
    }
    hasher.write_u64(fragments.len() as u64);
    for fragment in fragments {
        if let Some(selector) = &fragment.selector {
            hasher.write(selector.0.as_bytes());
        }
        hasher.write(fragment.to_string().as_bytes());
    }
    hasher.finish()
}

fn hash_join(hasher: &mut Xxh64, join: &JoinCommand) {
    if let Some(selector) = &join.key.selector {
        hasher.write(selector.0.as_bytes());
    }
    hasher.write_u8(0);
    hasher.write(join.alias.as_bytes());
}
