//! Export behavior tests for scoped registrations.
//!
//! These tests verify that:
//! 1. Exported services become reachable from the parent and the launched app
//! 2. Renamed exports publish under the requested qualifier only
//! 3. Multiple export declarations alias one pooled instance
//! 4. Root-scope exports and cross-sibling lookups fail the build

use std::sync::Arc;

use grappelli_assembly::ContainerBuilder;
use grappelli_core::error::DeclarationError;
use grappelli_core::{BuildError, BuildReport, LaunchError};
use rstest::*;

#[derive(Debug)]
struct Cache {
	entries: usize,
}

struct Reader {
	summary: String,
}

fn report_of(error: BuildError) -> BuildReport {
	match error {
		BuildError::Report(report) => report,
		other => panic!("expected an aggregated report, got {other}"),
	}
}

#[rstest]
fn exported_service_is_reachable_from_the_launched_app() {
	// Arrange
	let mut builder = ContainerBuilder::new("app");
	builder
		.scope("storage", |storage| {
			storage
				.bean("Cache::warm", || Cache { entries: 64 })?
				.export();
			Ok(())
		})
		.unwrap();

	// Act
	let context = builder.build().unwrap().launch().unwrap();

	// Assert
	assert_eq!(context.get::<Cache>().unwrap().entries, 64);
}

#[rstest]
fn export_as_publishes_under_the_renamed_key_only() {
	// Arrange
	let mut builder = ContainerBuilder::new("app");
	builder
		.scope("standby", |standby| {
			standby
				.bean("Cache::warm", || Cache { entries: 16 })?
				.export_as("replica");
			Ok(())
		})
		.unwrap();

	// Act
	let context = builder.build().unwrap().launch().unwrap();

	// Assert
	assert!(matches!(
		context.get::<Cache>().unwrap_err(),
		LaunchError::UnknownService { .. }
	));
	assert_eq!(context.get_qualified::<Cache>("replica").unwrap().entries, 16);
}

#[rstest]
fn several_export_declarations_alias_one_instance() {
	// Arrange
	let mut builder = ContainerBuilder::new("app");
	builder
		.scope("storage", |storage| {
			storage
				.bean("Cache::warm", || Cache { entries: 8 })?
				.export()
				.export_as("replica");
			Ok(())
		})
		.unwrap();

	// Act
	let context = builder.build().unwrap().launch().unwrap();

	// Assert
	let plain = context.get::<Cache>().unwrap();
	let renamed = context.get_qualified::<Cache>("replica").unwrap();
	assert!(Arc::ptr_eq(&plain, &renamed));
}

#[rstest]
fn qualified_bean_exports_keep_their_qualifier() {
	// Arrange
	let mut builder = ContainerBuilder::new("app");
	builder
		.scope("storage", |storage| {
			storage
				.bean("Cache::warm", || Cache { entries: 4 })?
				.qualified("hot")
				.export();
			Ok(())
		})
		.unwrap();

	// Act
	let context = builder.build().unwrap().launch().unwrap();

	// Assert
	assert!(context.get::<Cache>().is_err());
	assert_eq!(context.get_qualified::<Cache>("hot").unwrap().entries, 4);
}

#[rstest]
fn optional_export_publishes_when_the_service_exists() {
	// Arrange
	let mut builder = ContainerBuilder::new("app");
	builder
		.scope("storage", |storage| {
			storage
				.bean("Cache::warm", || Cache { entries: 32 })?
				.export_optional();
			Ok(())
		})
		.unwrap();

	// Act
	let context = builder.build().unwrap().launch().unwrap();

	// Assert
	assert_eq!(context.get::<Cache>().unwrap().entries, 32);
}

#[rstest]
fn root_scope_exports_fail_the_build() {
	// Arrange
	let mut builder = ContainerBuilder::new("app");
	builder
		.bean("Cache::warm", || Cache { entries: 1 })
		.unwrap()
		.export_as("replica");

	// Act
	let error = builder.build().unwrap_err();

	// Assert
	assert!(matches!(
		error,
		BuildError::Declaration(DeclarationError::RootExport { .. })
	));
}

#[rstest]
fn sibling_scopes_cannot_see_each_other() {
	// Arrange
	let mut builder = ContainerBuilder::new("app");
	builder
		.scope("left", |left| {
			left.bean("Cache::warm", || Cache { entries: 2 })?.finish();
			Ok(())
		})
		.unwrap();
	builder
		.scope("right", |right| {
			right
				.bean("Reader::new", |cache: Arc<Cache>| Reader {
					summary: format!("{} entries", cache.entries),
				})?
				.export();
			Ok(())
		})
		.unwrap();

	// Act
	let report = report_of(builder.build().unwrap_err());

	// Assert
	assert_eq!(report.missing().len(), 1);
	assert!(report.missing()[0].requesters[0].contains("Reader::new"));
}
