use super::random::{random_item, two_digit_float};
use crate::config::GeneratorLimits;
use crate::engines::grammar::{LSystem, Module, Param};
use log::debug;
use rand::Rng;

/// Names given to the formal parameters of generated predecessors.
const FORMAL_NAMES: [&str; 3] = ["x", "y", "z"];

/// Describes a letter the generators may emit.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateModule {
    pub letter: char,
    pub param_count: usize,
    /// Relative frequency in weighted generation.
    pub weight: u32,
    pub scale_min: f64,
    pub scale_max: f64,
}

impl TemplateModule {
    pub fn new(letter: char, param_count: usize, weight: u32) -> Self {
        Self {
            letter,
            param_count,
            weight,
            scale_min: 0.0,
            scale_max: 1.0,
        }
    }

    pub fn with_scale(mut self, min: f64, max: f64) -> Self {
        self.scale_min = min;
        self.scale_max = max;
        self
    }

    pub fn constant<R: Rng>(&self, rng: &mut R) -> f64 {
        two_digit_float(rng, self.scale_min, self.scale_max)
    }
}

/// The alphabet available to the generators and the rules for filling in
/// parameters of freshly generated modules.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    templates: Vec<TemplateModule>,
    pub parameterized: bool,
    pub defines_probability: f64,
    pub constants_probability: f64,
    pub max_defines: usize,
    pub min_define_value: f64,
    pub max_define_value: f64,
}

impl TemplateLibrary {
    pub fn new(
        parameterized: bool,
        defines_probability: f64,
        constants_probability: f64,
        limits: &GeneratorLimits,
    ) -> Self {
        let mut templates = vec![
            TemplateModule::new('F', 1, 50).with_scale(0.01, 0.1),
            TemplateModule::new('X', 2, 5),
            TemplateModule::new('Y', 2, 5),
            TemplateModule::new('Z', 2, 5),
            TemplateModule::new('A', 1, 5),
        ];
        for letter in ['+', '-', '&', '^', '/', '\\'] {
            templates.push(TemplateModule::new(letter, 1, 20).with_scale(0.0, 30.0));
        }
        templates.push(TemplateModule::new('L', 1, 50));
        for letter in ['B', 'K', 'R'] {
            templates.push(TemplateModule::new(letter, 1, 10));
        }
        templates.push(TemplateModule::new('!', 1, 20).with_scale(0.0, 2.0));

        Self {
            templates,
            parameterized,
            defines_probability,
            constants_probability,
            max_defines: limits.max_defines,
            min_define_value: limits.min_define_value,
            max_define_value: limits.max_define_value,
        }
    }

    pub fn templates(&self) -> &[TemplateModule] {
        &self.templates
    }

    pub fn get(&self, letter: char) -> Option<&TemplateModule> {
        self.templates.iter().find(|t| t.letter == letter)
    }

    pub fn contains(&self, letter: char) -> bool {
        self.get(letter).is_some()
    }

    pub fn letters(&self) -> Vec<char> {
        self.templates.iter().map(|t| t.letter).collect()
    }

    pub fn weights(&self) -> Vec<u32> {
        self.templates.iter().map(|t| t.weight).collect()
    }

    /// Instantiate `template`. Predecessors get formal names, other modules get
    /// a constant, a define reference or `1` depending on the probabilities.
    /// New defines are registered on `lsystem`.
    pub fn create_module<R: Rng>(
        &self,
        template: &TemplateModule,
        predecessor: bool,
        lsystem: &mut LSystem,
        rng: &mut R,
    ) -> Module {
        let mut module = Module::bare(template.letter);
        if !self.parameterized {
            return module;
        }

        for index in 0..template.param_count {
            let value = if predecessor {
                match FORMAL_NAMES.get(index) {
                    Some(name) => Param::symbol(*name),
                    None => Param::Number(1.0),
                }
            } else if self.constants_probability > 0.0 {
                if rng.gen::<f64>() < self.constants_probability {
                    Param::Number(template.constant(rng))
                } else {
                    Param::Number(1.0)
                }
            } else if self.defines_probability > 0.0 && rng.gen::<f64>() < self.defines_probability
            {
                Param::Symbol(self.pick_define(lsystem, rng))
            } else {
                Param::Number(1.0)
            };
            module.params.push(value);
        }
        module
    }

    /// Reuse an existing define or create a new one.
    fn pick_define<R: Rng>(&self, lsystem: &mut LSystem, rng: &mut R) -> String {
        let count = lsystem.defines().len();
        if count > 0 && (rng.gen::<f64>() > 0.5 || count >= self.max_defines) {
            let names: Vec<String> = lsystem.defines().keys().cloned().collect();
            if let Some(name) = random_item(&names, rng) {
                return name.clone();
            }
        }
        self.new_define(lsystem, rng)
    }

    /// Adds `d<n>` with a random value and returns its name.
    pub fn new_define<R: Rng>(&self, lsystem: &mut LSystem, rng: &mut R) -> String {
        let mut index = lsystem.defines().len();
        while lsystem.defines().contains_key(&format!("d{}", index)) {
            index += 1;
        }
        let name = format!("d{}", index);
        let value = two_digit_float(rng, self.min_define_value, self.max_define_value);
        debug!("New define {} = {}", name, value);
        lsystem.add_define(name.clone(), value);
        name
    }
}
