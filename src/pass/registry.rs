//! The catalog of passes that can be created by name.

use super::{Pass, PassKind};
use lazy_static::lazy_static;
use std::collections::BTreeMap;

type Factory = Box<dyn Fn() -> PassKind + Send + Sync>;

struct PassInfo {
    description: String,
    create: Factory,
}

/// Maps pass names to factories. Names are kept sorted so listings
/// are stable.
#[derive(Default)]
pub struct Catalog {
    passes: BTreeMap<String, PassInfo>,
}

lazy_static! {
    static ref BUILTIN: Catalog = Catalog::new();
}

impl Catalog {
    /// A catalog with nothing registered.
    pub fn empty() -> Catalog {
        Catalog::default()
    }

    /// A catalog with every built-in pass registered.
    pub fn new() -> Catalog {
        let mut catalog = Catalog::empty();
        crate::passes::register_all(&mut catalog);
        catalog
    }

    /// The shared catalog of built-in passes.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Register a pass under `name`. Registering a name again replaces
    /// the earlier entry.
    pub fn register<F>(&mut self, name: &str, description: &str, create: F)
    where
        F: Fn() -> PassKind + Send + Sync + 'static,
    {
        let info = PassInfo {
            description: description.to_owned(),
            create: Box::new(create),
        };
        if self.passes.insert(name.to_owned(), info).is_some() {
            log::debug!("register: replaced existing pass '{}'", name);
        }
    }

    pub fn create_pass(&self, name: &str) -> Option<Pass> {
        let info = self.passes.get(name)?;
        Some(Pass::new(name, (info.create)()))
    }

    pub fn registered_names(&self) -> impl Iterator<Item = &str> {
        self.passes.keys().map(|name| &name[..])
    }

    pub fn pass_description(&self, name: &str) -> Option<&str> {
        self.passes.get(name).map(|info| &info.description[..])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.passes.contains_key(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::Module;
    use crate::pass::{ModulePass, PassOptions};

    struct Marker(u32);

    impl ModulePass for Marker {
        fn run(&mut self, _options: &PassOptions, module: &mut Module) -> anyhow::Result<()> {
            module.add_global(&format!("marker{}", self.0), crate::ir::Type::I32, false);
            Ok(())
        }
    }

    #[test]
    fn builtin_names_create_passes() {
        let catalog = Catalog::new();
        let names: Vec<&str> = catalog.registered_names().collect();
        assert!(names.contains(&"taint"));
        assert!(names.contains(&"precompute"));
        for name in names {
            let pass = catalog.create_pass(name).unwrap();
            assert_eq!(pass.name(), name);
            assert!(catalog.pass_description(name).is_some());
        }
        assert!(catalog.create_pass("no-such-pass").is_none());
        assert!(catalog.pass_description("no-such-pass").is_none());
    }

    #[test]
    fn last_registration_wins() {
        let _ = env_logger::try_init();
        let mut catalog = Catalog::empty();
        catalog.register("mark", "first", || PassKind::Module(Box::new(Marker(1))));
        catalog.register("mark", "second", || PassKind::Module(Box::new(Marker(2))));
        assert_eq!(catalog.registered_names().count(), 1);
        assert_eq!(catalog.pass_description("mark"), Some("second"));

        let mut module = Module::empty();
        match catalog.create_pass("mark").unwrap().kind {
            PassKind::Module(mut pass) => pass.run(&PassOptions::default(), &mut module).unwrap(),
            PassKind::Function(_) => panic!("expected a module pass"),
        }
        assert_eq!(module.globals.values().next().unwrap().name, "marker2");
    }

    #[test]
    fn instances_are_independent() {
        let catalog = Catalog::builtin();
        let a = catalog.create_pass("vacuum").unwrap();
        let b = catalog.create_pass("vacuum").unwrap();
        assert_eq!(a.name(), b.name());
        assert!(a.is_function_parallel());
        assert!(catalog.contains("print"));
    }
}
