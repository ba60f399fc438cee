use proc_macro::TokenStream;

mod injectable;
mod module;

/// Derive macro listing a struct's `#[inject]` fields for the container
///
/// Every `#[inject]` field must be an `Injected<T>`. The container fills it
/// right after construction, before any `#[post_construct]` method runs.
///
/// # Example
/// ```ignore
/// use quill::{Injectable, Injected};
///
/// #[derive(Injectable)]
/// pub struct CommandManager {
///     #[inject]
///     events: Injected<EventManager>,
///     handlers: Vec<Handler>,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable(input)
}

/// Attribute macro turning an impl block into a module definition
///
/// Associated functions returning `Self` (or `Result<Self, E>`) whose
/// parameters are all `Arc<T>` become constructors; `#[inject]` marks the one
/// the container should prefer. `&self` methods marked `#[post_construct]` or
/// `#[pre_destroy]` become lifecycle callbacks.
///
/// The type is submitted for discovery unless `discover = false` is given, in
/// which case it must be declared on the container explicitly.
///
/// # Example
/// ```ignore
/// use quill::module;
///
/// #[module]
/// impl CommandManager {
///     fn new() -> Self { /* ... */ }
///
///     #[inject]
///     fn with_events(events: Arc<EventManager>) -> Self { /* ... */ }
///
///     #[post_construct]
///     fn register_all(&self) { /* ... */ }
///
///     #[pre_destroy]
///     fn unregister_all(&self) -> anyhow::Result<()> { /* ... */ }
/// }
/// ```
#[proc_macro_attribute]
pub fn module(attr: TokenStream, item: TokenStream) -> TokenStream {
    module::module_attribute(attr, item)
}
