pub mod catalog;
pub mod config;
pub mod review;
pub mod submit;
pub mod system;
pub mod wizard;

use crate::cli::registry::CommandRegistry;

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    let definitions = wizard::definitions()
        .into_iter()
        .chain(review::definitions())
        .chain(submit::definitions())
        .chain(catalog::definitions())
        .chain(config::definitions())
        .chain(system::definitions());
    for entry in definitions {
        registry.register(entry);
    }
}
