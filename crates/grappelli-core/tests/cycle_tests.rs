//! Cycle rejection tests driven through the public build pipeline.
//!
//! These tests verify that:
//! 1. Mutually dependent constructors abort the build with a cycle error
//! 2. The reported chain is truncated to the loop itself
//! 3. Self-dependence and setter-introduced loops are caught the same way
//! 4. Constants and diamond sharing do not count as cycles

use std::sync::Arc;

use grappelli_core::provider::BoxedValue;
use grappelli_core::{
	BuildError, Declared, DependantKind, GraphBuilder, RawInvocable, ServiceKey,
};
use rstest::*;

struct Alpha;
struct Beta;
struct Gamma;

fn unit_bean() -> RawInvocable {
	RawInvocable::Bean(Arc::new(|_| Ok(Box::new(()) as BoxedValue)))
}

fn chain_of(error: BuildError) -> Vec<String> {
	match error {
		BuildError::Cycle { chain } => chain,
		other => panic!("expected a cycle, got {other}"),
	}
}

#[rstest]
fn mutually_dependent_constructors_are_rejected() {
	// Arrange
	let mut builder = GraphBuilder::new("app");
	let root = builder.root();
	let alpha = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Alpha::new",
			vec![Declared::value::<Beta>()],
			unit_bean(),
		)
		.unwrap();
	builder.materialize(alpha);
	builder
		.bind(root, ServiceKey::of::<Alpha>(), "Alpha::new", alpha)
		.unwrap();
	let beta = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Beta::new",
			vec![Declared::value::<Alpha>()],
			unit_bean(),
		)
		.unwrap();
	builder.materialize(beta);
	builder
		.bind(root, ServiceKey::of::<Beta>(), "Beta::new", beta)
		.unwrap();

	// Act
	let chain = chain_of(builder.resolve_and_build().unwrap_err());

	// Assert
	assert_eq!(chain, vec!["Alpha::new".to_string(), "Beta::new".to_string()]);
}

#[rstest]
fn reported_chain_is_truncated_to_the_loop() {
	// Arrange
	let mut builder = GraphBuilder::new("app");
	let root = builder.root();
	let entry = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Entry::new",
			vec![Declared::value::<Alpha>()],
			unit_bean(),
		)
		.unwrap();
	builder.materialize(entry);
	let hub = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Hub::new",
			vec![Declared::value::<Beta>()],
			unit_bean(),
		)
		.unwrap();
	builder.materialize(hub);
	builder
		.bind(root, ServiceKey::of::<Alpha>(), "Hub::new", hub)
		.unwrap();
	let spoke = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Spoke::new",
			vec![Declared::value::<Alpha>()],
			unit_bean(),
		)
		.unwrap();
	builder.materialize(spoke);
	builder
		.bind(root, ServiceKey::of::<Beta>(), "Spoke::new", spoke)
		.unwrap();

	// Act
	let chain = chain_of(builder.resolve_and_build().unwrap_err());

	// Assert
	assert_eq!(chain, vec!["Hub::new".to_string(), "Spoke::new".to_string()]);
}

#[rstest]
fn self_dependence_reports_a_single_element_chain() {
	// Arrange
	let mut builder = GraphBuilder::new("app");
	let root = builder.root();
	let narcissus = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Narcissus::new",
			vec![Declared::value::<Alpha>()],
			unit_bean(),
		)
		.unwrap();
	builder.materialize(narcissus);
	builder
		.bind(root, ServiceKey::of::<Alpha>(), "Narcissus::new", narcissus)
		.unwrap();

	// Act
	let chain = chain_of(builder.resolve_and_build().unwrap_err());

	// Assert
	assert_eq!(chain, vec!["Narcissus::new".to_string()]);
}

#[rstest]
fn setter_dependency_closes_a_loop_through_the_owner() {
	// Arrange
	let mut builder = GraphBuilder::new("app");
	let root = builder.root();
	let owner = builder
		.register_dependant(root, DependantKind::Constructor, "Owner::new", Vec::new(), unit_bean())
		.unwrap();
	builder.materialize(owner);
	builder
		.bind(root, ServiceKey::of::<Alpha>(), "Owner::new", owner)
		.unwrap();

	let setter = builder
		.register_dependant(
			root,
			DependantKind::MemberSetter,
			"Owner::set_peer",
			vec![Declared::value::<Beta>()],
			RawInvocable::Setter(Arc::new(|_, _| Ok(()))),
		)
		.unwrap();
	builder.attach_setter(owner, setter).unwrap();

	let peer = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Peer::new",
			vec![Declared::value::<Alpha>()],
			unit_bean(),
		)
		.unwrap();
	builder.materialize(peer);
	builder
		.bind(root, ServiceKey::of::<Beta>(), "Peer::new", peer)
		.unwrap();

	// Act
	let chain = chain_of(builder.resolve_and_build().unwrap_err());

	// Assert
	assert_eq!(chain, vec!["Owner::new".to_string(), "Peer::new".to_string()]);
}

#[rstest]
fn a_constant_link_breaks_the_loop() {
	// Arrange
	let mut builder = GraphBuilder::new("app");
	let root = builder.root();
	builder
		.register_constant(root, ServiceKey::of::<Alpha>(), "alpha_stub", Arc::new(7i64))
		.unwrap();
	let beta = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Beta::new",
			vec![Declared::value::<Alpha>()],
			unit_bean(),
		)
		.unwrap();
	builder.materialize(beta);
	builder
		.bind(root, ServiceKey::of::<Beta>(), "Beta::new", beta)
		.unwrap();
	let gamma = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Gamma::new",
			vec![Declared::value::<Beta>()],
			unit_bean(),
		)
		.unwrap();
	builder.materialize(gamma);

	// Act
	let plans = builder.resolve_and_build().unwrap();

	// Assert
	assert!(plans.launch().is_ok());
}

#[rstest]
fn deferred_loops_are_rejected_before_compilation() {
	// Arrange
	let mut builder = GraphBuilder::new("app");
	let root = builder.root();
	let alpha = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Alpha::new",
			vec![Declared::value::<Beta>()],
			unit_bean(),
		)
		.unwrap();
	builder.defer(alpha);
	builder
		.bind(root, ServiceKey::of::<Alpha>(), "Alpha::new", alpha)
		.unwrap();
	let beta = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Beta::new",
			vec![Declared::value::<Alpha>()],
			unit_bean(),
		)
		.unwrap();
	builder.defer(beta);
	builder
		.bind(root, ServiceKey::of::<Beta>(), "Beta::new", beta)
		.unwrap();

	// Act
	let chain = chain_of(builder.resolve_and_build().unwrap_err());

	// Assert
	assert_eq!(chain.len(), 2);
}

#[rstest]
fn diamond_sharing_is_not_a_cycle() {
	// Arrange
	let mut builder = GraphBuilder::new("app");
	let root = builder.root();
	let base = builder
		.register_dependant(root, DependantKind::Constructor, "Base::new", Vec::new(), unit_bean())
		.unwrap();
	builder.materialize(base);
	builder
		.bind(root, ServiceKey::of::<Alpha>(), "Base::new", base)
		.unwrap();
	let left = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Left::new",
			vec![Declared::value::<Alpha>()],
			unit_bean(),
		)
		.unwrap();
	builder.materialize(left);
	builder
		.bind(root, ServiceKey::of::<Beta>(), "Left::new", left)
		.unwrap();
	let right = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Right::new",
			vec![Declared::value::<Alpha>()],
			unit_bean(),
		)
		.unwrap();
	builder.materialize(right);
	builder
		.bind(root, ServiceKey::of::<Gamma>(), "Right::new", right)
		.unwrap();
	let apex = builder
		.register_dependant(
			root,
			DependantKind::Constructor,
			"Apex::new",
			vec![Declared::value::<Beta>(), Declared::value::<Gamma>()],
			unit_bean(),
		)
		.unwrap();
	builder.materialize(apex);

	// Act
	let plans = builder.resolve_and_build().unwrap();

	// Assert
	let labels: Vec<&str> = plans
		.materialization()
		.iter()
		.map(|unit| unit.label())
		.collect();
	assert_eq!(labels.iter().filter(|label| **label == "Base::new").count(), 1);
	let base_at = labels.iter().position(|label| *label == "Base::new").unwrap();
	let apex_at = labels.iter().position(|label| *label == "Apex::new").unwrap();
	assert!(base_at < apex_at);
}
