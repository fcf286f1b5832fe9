//! Scheduling passes over a module.

use super::debug::{dump_path, pass_debug_level, DebugLevel, Snapshot};
use super::{Catalog, FunctionPass, Pass, PassKind, PassOptions};
use crate::errors::PassError;
use crate::ir::{Func, FunctionBody, Module};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

/// Runs an ordered list of passes over a module.
///
/// Passes run one at a time, in the order they were added. A
/// function-parallel pass fans out over the module's functions, one
/// independent copy of the pass per function, and every function
/// finishes before the next pass starts.
pub struct PassRunner<'c> {
    catalog: &'c Catalog,
    passes: Vec<Pass>,
    options: PassOptions,
    /// Set on the per-function runners created by a parallel pass.
    nested: bool,
    debug_level: DebugLevel,
    dump_dir: PathBuf,
}

impl<'c> PassRunner<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        PassRunner {
            catalog,
            passes: vec![],
            options: PassOptions::default(),
            nested: false,
            debug_level: pass_debug_level(),
            dump_dir: PathBuf::from("."),
        }
    }

    pub fn with_options(catalog: &'c Catalog, options: PassOptions) -> Self {
        let mut runner = PassRunner::new(catalog);
        runner.options = options;
        runner
    }

    /// Append the catalog pass called `name`.
    pub fn add(&mut self, name: &str) -> Result<(), PassError> {
        let pass = self
            .catalog
            .create_pass(name)
            .ok_or_else(|| PassError::UnknownPass(name.to_owned()))?;
        self.passes.push(pass);
        Ok(())
    }

    /// Append a pass that was not created through the catalog.
    pub fn add_pass(&mut self, pass: Pass) {
        self.passes.push(pass);
    }

    /// Append the default optimization pipeline: the global pre-passes,
    /// the function passes, then the global post-passes.
    pub fn add_default_optimization_passes(&mut self) -> Result<(), PassError> {
        self.add_default_global_optimization_pre_passes()?;
        self.add_default_function_optimization_passes()?;
        self.add_default_global_optimization_post_passes()
    }

    /// Passes that work on individual functions.
    pub fn add_default_function_optimization_passes(&mut self) -> Result<(), PassError> {
        self.add("precompute")?;
        self.add("vacuum")
    }

    /// Whole-module passes that are worth running before the function
    /// passes.
    pub fn add_default_global_optimization_pre_passes(&mut self) -> Result<(), PassError> {
        self.add("propagate-globals")
    }

    /// Whole-module passes for the end of the pipeline. No optimization
    /// is assumed to run after these.
    pub fn add_default_global_optimization_post_passes(&mut self) -> Result<(), PassError> {
        if self.options.optimize_level >= 2 || self.options.shrink_level >= 1 {
            self.add("generate-stack-ir")?;
        }
        Ok(())
    }

    /// The last pass of type `P` in this runner, for reading back what
    /// an analysis found after `run`. Function-parallel passes run as
    /// per-function copies, so only the original instance is returned.
    pub fn get_last<P: 'static>(&self) -> Option<&P> {
        self.passes
            .iter()
            .rev()
            .find_map(|pass| pass.downcast_ref::<P>())
    }

    pub fn pass_names(&self) -> impl Iterator<Item = &str> {
        self.passes.iter().map(|pass| pass.name())
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn options(&self) -> &PassOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: PassOptions) {
        self.options = options;
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.options.debug = debug;
        // Validate everything while debugging.
        self.options.validate_globally = debug;
    }

    pub fn set_debug_info(&mut self, debug_info: bool) {
        self.options.debug_info = debug_info;
    }

    pub fn set_validate_globally(&mut self, validate: bool) {
        self.options.validate_globally = validate;
    }

    pub fn set_nested(&mut self, nested: bool) {
        self.nested = nested;
    }

    pub fn set_debug_level(&mut self, level: DebugLevel) {
        self.debug_level = level;
    }

    pub fn set_dump_dir(&mut self, dir: impl Into<PathBuf>) {
        self.dump_dir = dir.into();
    }

    fn effective_debug_level(&self) -> DebugLevel {
        if self.nested {
            DebugLevel::Off
        } else if self.options.debug {
            std::cmp::max(self.debug_level, DebugLevel::Validate)
        } else {
            self.debug_level
        }
    }

    /// Run every pass, in order, over `module`.
    pub fn run(&mut self, module: &mut Module) -> Result<()> {
        let level = self.effective_debug_level();
        let mut snapshot = Snapshot::new();
        if level >= DebugLevel::Snapshot {
            snapshot.record("<input>", module);
        }
        let total = Instant::now();

        for index in 0..self.passes.len() {
            let name = self.passes[index].name().to_owned();
            if !level.is_on() {
                log::debug!("running pass: {}", name);
                run_pass(
                    self.catalog,
                    &self.options,
                    &mut self.passes[index],
                    module,
                )?;
                continue;
            }

            log::info!("[PassRunner] running pass: {}...", name);
            let start = Instant::now();
            run_pass(
                self.catalog,
                &self.options,
                &mut self.passes[index],
                module,
            )?;
            log::info!("[PassRunner]   {} took {:?}", name, start.elapsed());

            if self.options.validate {
                if let Err(e) = module.validate(self.options.validate_globally) {
                    log::error!("[PassRunner] module invalid after {}: {}", name, e);
                    let mut message = e.to_string();
                    if let Some((line, good, bad)) = snapshot.first_divergence(module) {
                        let after = snapshot.last_good().map(|(pass, _)| pass).unwrap_or("");
                        let diff = format!(
                            "first difference from the module after {}, line {}:\n  - {}\n  + {}",
                            after, line, good, bad
                        );
                        log::error!("[PassRunner] {}", diff);
                        message = format!("{}\n{}", message, diff);
                    }
                    return Err(PassError::ValidationFailed {
                        pass: name,
                        message,
                    }
                    .into());
                }
                log::info!("[PassRunner]   (validated)");
            }

            if level >= DebugLevel::Snapshot {
                snapshot.record(&name, module);
            }
            if level >= DebugLevel::Dump {
                let path = dump_path(&self.dump_dir, index, &name);
                std::fs::write(&path, format!("{}", module.display()))
                    .with_context(|| format!("writing pass dump {}", path.display()))?;
            }
        }

        if level.is_on() {
            log::info!(
                "[PassRunner] {} passes took {:?}",
                self.passes.len(),
                total.elapsed()
            );
        }
        Ok(())
    }

    /// Run the function-parallel passes on a single function. Other
    /// passes are skipped.
    pub fn run_on_function(&mut self, module: &mut Module, func: Func) -> Result<()> {
        let mut body = match module.funcs.get_mut(func).and_then(|decl| decl.body_mut()) {
            Some(body) => std::mem::take(body),
            None => return Err(PassError::NoFunctionBody(func).into()),
        };
        let result = self.run_on_body(module, func, &mut body);
        if let Some(slot) = module.funcs[func].body_mut() {
            *slot = body;
        }
        result
    }

    fn run_on_body(&mut self, module: &Module, func: Func, body: &mut FunctionBody) -> Result<()> {
        for pass in &mut self.passes {
            if !pass.is_function_parallel() {
                log::debug!(
                    "run_on_function: skipping {}, not function-parallel",
                    pass.name()
                );
                continue;
            }
            pass.prepare_to_run(&self.options, module);
            let modifies = pass.modifies_ir();
            if let PassKind::Function(function_pass) = &mut pass.kind {
                function_pass.run_on_function(&self.options, module, func, body)?;
                if modifies {
                    body.invalidate();
                }
            }
        }
        Ok(())
    }
}

fn run_pass(
    catalog: &Catalog,
    options: &PassOptions,
    pass: &mut Pass,
    module: &mut Module,
) -> Result<()> {
    pass.prepare_to_run(options, module);
    let modifies = pass.modifies_ir();
    let parallel = pass.is_function_parallel();
    let name = pass.name().to_owned();

    match &mut pass.kind {
        PassKind::Module(module_pass) => {
            module_pass.run(options, module)?;
            if modifies {
                module.per_func_body(|body| body.invalidate());
            }
        }
        PassKind::Function(function_pass) if parallel => {
            run_parallel(catalog, options, &name, function_pass.as_ref(), module)?;
        }
        PassKind::Function(function_pass) => {
            let mut bodies = module.take_bodies();
            let mut result = Ok(());
            for (func, body) in bodies.iter_mut() {
                result = function_pass.run_on_function(options, module, *func, body);
                if result.is_err() {
                    break;
                }
                if modifies {
                    body.invalidate();
                }
            }
            module.restore_bodies(bodies);
            result?;
        }
    }
    Ok(())
}

/// Run one copy of `pass` per function body, each in its own nested
/// runner on the rayon pool.
fn run_parallel(
    catalog: &Catalog,
    options: &PassOptions,
    name: &str,
    pass: &dyn FunctionPass,
    module: &mut Module,
) -> Result<()> {
    let jobs: Vec<(Func, FunctionBody, Box<dyn FunctionPass>)> = module
        .take_bodies()
        .into_iter()
        .map(|(func, body)| (func, body, pass.create()))
        .collect();
    log::debug!("run_parallel: {} over {} functions", name, jobs.len());

    let shared: &Module = module;
    let outcomes: Vec<(Func, FunctionBody, Result<()>)> = jobs
        .into_par_iter()
        .map(|(func, mut body, instance)| {
            let mut nested = PassRunner::with_options(catalog, options.clone());
            nested.set_nested(true);
            nested.add_pass(Pass::new(name, PassKind::Function(instance)));
            let result = nested.run_on_body(shared, func, &mut body);
            (func, body, result)
        })
        .collect();

    let mut first_error = None;
    let mut bodies = Vec::with_capacity(outcomes.len());
    for (func, body, result) in outcomes {
        if let Err(e) = result {
            log::debug!("run_parallel: {} failed on {}: {}", name, func, e);
            first_error.get_or_insert(e);
        }
        bodies.push((func, body));
    }
    module.restore_bodies(bodies);

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
