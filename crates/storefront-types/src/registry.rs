//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Every pluggable backend (storage, transport, cipher) exposes a `Registry`
/// type implementing this trait, tying the name used under
/// `implementations.<name>` in the configuration file to its factory.
pub trait ImplementationRegistry {
	/// Name of the implementation in configuration files, e.g. `"memory"`
	/// for `storage.implementations.memory`.
	const NAME: &'static str;

	/// Factory function type of the owning crate.
	type Factory;

	/// Returns the factory that builds this implementation from its table.
	fn factory() -> Self::Factory;
}
