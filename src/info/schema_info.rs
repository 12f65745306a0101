//! The query engine: mutability, aliasing and determinism answers for one schema.
use super::argument::{ArgumentKey, SchemaArgType, SchemaArgument};
use super::error::InvalidArgument;
use super::values::ArgumentValue;
use crate::alias::AliasModel;
use crate::registry::{self, OperatorRegistry};
use crate::schema::{self, ParseError, SchemaSignature};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, trace};

/// Static analysis over a parsed operator schema.
///
/// Built once from a schema string; the alias model is derived at
/// construction and rebuilt only when argument values are attached. All
/// queries take `&self`, so an instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct SchemaInfo {
    signature: SchemaSignature,
    /// Indexed by input position.
    values: Vec<Option<ArgumentValue>>,
    alias_model: AliasModel,
    registry: &'static OperatorRegistry,
}

impl SchemaInfo {
    /// Parses `schema` and builds the engine against the process-wide registry.
    pub fn new(schema: &str) -> Result<Self, ParseError> {
        Self::with_registry(schema, registry::global())
    }

    pub fn with_registry(
        schema: &str,
        registry: &'static OperatorRegistry,
    ) -> Result<Self, ParseError> {
        Ok(Self::from_signature_in(schema::parse(schema)?, registry))
    }

    pub fn from_signature(signature: SchemaSignature) -> Self {
        Self::from_signature_in(signature, registry::global())
    }

    pub fn from_signature_in(
        signature: SchemaSignature,
        registry: &'static OperatorRegistry,
    ) -> Self {
        let alias_model = AliasModel::new(&signature);
        debug!(
            operator = %signature.name,
            inputs = signature.inputs.len(),
            outputs = signature.outputs.len(),
            wildcard = alias_model.has_wildcard(),
            "built schema info"
        );
        Self {
            values: vec![None; signature.inputs.len()],
            signature,
            alias_model,
            registry,
        }
    }

    // --- Accessors ---

    pub fn signature(&self) -> &SchemaSignature {
        &self.signature
    }

    pub fn signature_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.signature)
    }

    pub fn num_inputs(&self) -> usize {
        self.signature.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.signature.outputs.len()
    }

    pub fn has_argument(&self, name: &str) -> bool {
        self.signature.input_position(name).is_some()
    }

    // --- Queries ---

    /// Whether the call may write to the storage of the given input.
    pub fn is_mutating<'k>(
        &self,
        key: impl Into<ArgumentKey<'k>>,
    ) -> Result<bool, InvalidArgument> {
        let position = self.resolve_input(key.into())?;
        Ok(self.input_is_mutated(position))
    }

    /// Whether any input may be written.
    pub fn is_mutable(&self) -> bool {
        (0..self.num_inputs()).any(|position| self.input_is_mutated(position))
    }

    /// Whether the two arguments may share storage. Symmetric.
    pub fn are_aliasing(
        &self,
        first: SchemaArgument,
        second: SchemaArgument,
    ) -> Result<bool, InvalidArgument> {
        let a = self.slot(first)?;
        let b = self.slot(second)?;
        Ok(self.alias_model.may_alias(a, b))
    }

    /// Whether repeated calls with identical inputs produce identical outputs.
    pub fn is_deterministic(&self) -> bool {
        match self.registry.nondeterminism_rule(&self.signature.name) {
            None => true,
            Some(rule) => {
                let condition_value = rule.condition().and_then(|arg| self.value_of(arg));
                !rule.holds(condition_value)
            }
        }
    }

    // --- Argument values ---

    /// Attaches a runtime value to the input called `name`.
    pub fn add_argument_value(
        &mut self,
        name: &str,
        value: impl Into<ArgumentValue>,
    ) -> Result<(), InvalidArgument> {
        let position = self.resolve_input(ArgumentKey::Name(name))?;
        self.values[position] = Some(value.into());
        trace!(operator = %self.signature.name, argument = name, "attached argument value");
        self.rebuild_alias_model();
        Ok(())
    }

    /// Attaches values by position; `None` entries leave the slot unchanged.
    pub fn add_argument_values(
        &mut self,
        values: Vec<Option<ArgumentValue>>,
    ) -> Result<(), InvalidArgument> {
        if values.len() > self.num_inputs() {
            return Err(InvalidArgument::TooManyValues {
                given: values.len(),
                len: self.num_inputs(),
            });
        }
        for (slot, value) in self.values.iter_mut().zip(values) {
            if value.is_some() {
                *slot = value;
            }
        }
        self.rebuild_alias_model();
        Ok(())
    }

    /// Attaches values by name. Nothing is attached if any name is unknown.
    pub fn add_named_argument_values<I, S>(&mut self, values: I) -> Result<(), InvalidArgument>
    where
        I: IntoIterator<Item = (S, ArgumentValue)>,
        S: AsRef<str>,
    {
        let resolved = values
            .into_iter()
            .map(|(name, value)| {
                Ok((self.resolve_input(ArgumentKey::Name(name.as_ref()))?, value))
            })
            .collect::<Result<Vec<_>, InvalidArgument>>()?;
        for (position, value) in resolved {
            self.values[position] = Some(value);
        }
        self.rebuild_alias_model();
        Ok(())
    }

    // --- Internals ---

    fn resolve_input(&self, key: ArgumentKey<'_>) -> Result<usize, InvalidArgument> {
        match key {
            ArgumentKey::Index(index) => {
                checked_index(SchemaArgType::Input, index, self.num_inputs())
            }
            ArgumentKey::Name(name) => self
                .signature
                .input_position(name)
                .ok_or_else(|| InvalidArgument::UnknownName { name: name.to_string() }),
        }
    }

    /// Maps an argument reference into the alias model's slot space.
    fn slot(&self, argument: SchemaArgument) -> Result<usize, InvalidArgument> {
        match argument.kind {
            SchemaArgType::Input => {
                checked_index(SchemaArgType::Input, argument.index, self.num_inputs())
            }
            SchemaArgType::Output => {
                checked_index(SchemaArgType::Output, argument.index, self.num_outputs())
                    .map(|position| self.num_inputs() + position)
            }
        }
    }

    fn input_is_mutated(&self, position: usize) -> bool {
        if self.alias_model.is_written(position) {
            return true;
        }
        let Some(op) = self.registry.training_op(&self.signature.name) else {
            return false;
        };
        self.signature.inputs[position]
            .name
            .as_deref()
            .map_or(false, |name| op.may_mutate(name, self.value_of(&op.flag)))
    }

    fn value_of(&self, name: &str) -> Option<&ArgumentValue> {
        let position = self.signature.input_position(name)?;
        self.values[position].as_ref()
    }

    fn rebuild_alias_model(&mut self) {
        let mut first_user = HashMap::new();
        let mut shared = Vec::new();
        for (position, value) in self.values.iter().enumerate() {
            let Some(value) = value else { continue };
            for storage in value.storages() {
                let first = *first_user.entry(storage).or_insert(position);
                if first != position {
                    shared.push((first, position));
                }
            }
        }
        self.alias_model = AliasModel::with_shared_storage(&self.signature, &shared);
    }
}

fn checked_index(kind: SchemaArgType, index: i64, len: usize) -> Result<usize, InvalidArgument> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(InvalidArgument::IndexOutOfRange { kind, index, len })
}

impl FromStr for SchemaInfo {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::StorageId;
    use crate::registry::{NondeterministicOp, RegistryConfig, TrainingOp};
    use rstest::rstest;

    const SUB_: &str =
        "aten::sub_.Tensor(Tensor(a!) self, Tensor other, *, Scalar alpha=1) -> (Tensor(a!))";
    const SPLIT: &str =
        "aten::split.Tensor(Tensor(a -> *) self, int split_size, int dim=0) -> Tensor(a)[]";
    const DROPOUT: &str = "aten::dropout(Tensor input, float p, bool train) -> Tensor";
    const BATCH_NORM: &str = "aten::batch_norm(Tensor input, Tensor? weight, Tensor? bias, \
        Tensor? running_mean, Tensor? running_var, bool training, float momentum, float eps, \
        bool cudnn_enabled) -> Tensor";

    fn info(schema: &str) -> SchemaInfo {
        SchemaInfo::new(schema).unwrap()
    }

    fn leaked(config: RegistryConfig) -> &'static OperatorRegistry {
        Box::leak(Box::new(OperatorRegistry::from(config)))
    }

    // --- Mutability ---

    #[test]
    fn test_is_mutating_by_index_and_name() {
        let info = info(SUB_);
        assert!(info.is_mutating(0).unwrap());
        assert!(info.is_mutating("self").unwrap());
        assert!(!info.is_mutating(1).unwrap());
        assert!(!info.is_mutating("other").unwrap());
        assert!(!info.is_mutating("alpha").unwrap());
    }

    #[rstest]
    #[case(-1)]
    #[case(3)]
    #[case(4)]
    #[case(i64::MIN)]
    fn test_is_mutating_rejects_out_of_range(#[case] index: i64) {
        let err = info(SUB_).is_mutating(index).unwrap_err();
        assert_eq!(
            err,
            InvalidArgument::IndexOutOfRange { kind: SchemaArgType::Input, index, len: 3 }
        );
    }

    #[test]
    fn test_is_mutating_rejects_unknown_name() {
        let info = info(SUB_);
        let err = info.is_mutating("Self").unwrap_err();
        assert_eq!(err, InvalidArgument::UnknownName { name: "Self".into() });
        // The engine keeps answering after a rejected query.
        assert!(info.is_mutating(0).unwrap());
    }

    #[rstest]
    #[case(SUB_)]
    #[case(SPLIT)]
    #[case(DROPOUT)]
    #[case(BATCH_NORM)]
    #[case("ns::op(Tensor(a) x, Tensor(b -> *) y, Tensor(c) z) -> (Tensor(a!), Tensor(c))")]
    fn test_index_and_name_agree(#[case] schema: &str) {
        let info = info(schema);
        for (position, arg) in info.signature().inputs.iter().enumerate() {
            let name = arg.name.as_deref().unwrap();
            assert_eq!(
                info.is_mutating(position).unwrap(),
                info.is_mutating(name).unwrap(),
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_mutation_follows_alias_set() {
        // `x` carries no write marker itself but shares set `a` with a written output.
        let info = info("ns::op(Tensor(a) x, Tensor(b) y) -> Tensor(a!)");
        assert!(info.is_mutating("x").unwrap());
        assert!(!info.is_mutating("y").unwrap());
        assert!(info.is_mutable());
    }

    #[test]
    fn test_wildcard_mutation() {
        assert!(!info(SPLIT).is_mutating("self").unwrap());
        assert!(!info(SPLIT).is_mutable());

        let info = info("ns::op(Tensor(a -> *) x, Tensor(b!) y, Tensor(c) z) -> ()");
        assert!(info.is_mutating("x").unwrap());
        assert!(info.is_mutating("y").unwrap());
        assert!(!info.is_mutating("z").unwrap());
    }

    #[test]
    fn test_written_wildcard_mutates_its_root_label() {
        let info = info("ns::op(Tensor(a! -> *) x, Tensor(a) y, Tensor(b) z) -> ()");
        assert!(info.is_mutating("x").unwrap());
        assert!(info.is_mutating("y").unwrap());
        assert!(!info.is_mutating("z").unwrap());
        assert!(info.are_aliasing(SchemaArgument::input(0), SchemaArgument::input(1)).unwrap());
    }

    #[test]
    fn test_training_op_running_stats() {
        let mut info = info(BATCH_NORM);
        // Training flag unknown: conservatively written.
        assert!(info.is_mutating("running_mean").unwrap());
        assert!(info.is_mutating(4).unwrap());
        assert!(!info.is_mutating("input").unwrap());

        info.add_argument_value("training", false).unwrap();
        assert!(!info.is_mutating("running_mean").unwrap());
        assert!(!info.is_mutable());

        info.add_argument_value("training", true).unwrap();
        assert!(info.is_mutating("running_var").unwrap());
    }

    // --- Aliasing ---

    #[test]
    fn test_are_aliasing() {
        let info = info(SUB_);
        assert!(info.are_aliasing(SchemaArgument::input(0), SchemaArgument::output(0)).unwrap());
        assert!(!info.are_aliasing(SchemaArgument::input(1), SchemaArgument::output(0)).unwrap());
        assert!(!info.are_aliasing(SchemaArgument::input(1), SchemaArgument::input(0)).unwrap());
    }

    #[rstest]
    #[case(SchemaArgument::input(-1), SchemaArgument::output(0))]
    #[case(SchemaArgument::input(0), SchemaArgument::output(-1))]
    #[case(SchemaArgument::input(3), SchemaArgument::output(0))]
    #[case(SchemaArgument::input(0), SchemaArgument::output(1))]
    fn test_are_aliasing_rejects_out_of_range(
        #[case] first: SchemaArgument,
        #[case] second: SchemaArgument,
    ) {
        let info = info(SUB_);
        assert!(matches!(
            info.are_aliasing(first, second),
            Err(InvalidArgument::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            info.are_aliasing(second, first),
            Err(InvalidArgument::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_out_of_range_error_reports_side() {
        let err = info(SUB_)
            .are_aliasing(SchemaArgument::input(0), SchemaArgument::output(-1))
            .unwrap_err();
        assert_eq!(
            err,
            InvalidArgument::IndexOutOfRange { kind: SchemaArgType::Output, index: -1, len: 1 }
        );
        assert_eq!(err.to_string(), "output index -1 is out of range, expected 0 <= index < 1");
    }

    #[test]
    fn test_wildcard_aliases_output() {
        let info = info(SPLIT);
        assert!(info.are_aliasing(SchemaArgument::input(0), SchemaArgument::output(0)).unwrap());
        assert!(!info.are_aliasing(SchemaArgument::input(1), SchemaArgument::output(0)).unwrap());
    }

    #[test]
    fn test_aliasing_is_symmetric() {
        let info = info(
            "ns::op(Tensor(a) x, Tensor(b -> *) y, Tensor z, Tensor(c!) w) \
             -> (Tensor(a), Tensor(c!))",
        );
        let args: Vec<SchemaArgument> = (0..4)
            .map(SchemaArgument::input)
            .chain((0..2).map(SchemaArgument::output))
            .collect();
        for &a in &args {
            assert!(info.are_aliasing(a, a).unwrap());
            for &b in &args {
                assert_eq!(info.are_aliasing(a, b).unwrap(), info.are_aliasing(b, a).unwrap());
            }
        }
        assert!(info.are_aliasing(SchemaArgument::input(1), SchemaArgument::output(1)).unwrap());
        assert!(!info.are_aliasing(SchemaArgument::input(2), SchemaArgument::input(1)).unwrap());
    }

    #[test]
    fn test_value_aliasing_links_inputs() {
        let mut info = info("ns::op(Tensor(a!) x, Tensor y, Tensor z) -> ()");
        assert!(!info.is_mutating("y").unwrap());

        info.add_argument_values(vec![Some(StorageId(7).into()), Some(StorageId(7).into()), None])
            .unwrap();
        assert!(info.are_aliasing(SchemaArgument::input(0), SchemaArgument::input(1)).unwrap());
        assert!(info.is_mutating("y").unwrap());
        assert!(!info.is_mutating("z").unwrap());

        // Storage shared through a list value.
        let list = ArgumentValue::List(vec![StorageId(1).into(), StorageId(7).into()]);
        info.add_argument_value("z", list).unwrap();
        assert!(info.are_aliasing(SchemaArgument::input(2), SchemaArgument::input(1)).unwrap());
        assert!(info.is_mutating("z").unwrap());
    }

    #[test]
    fn test_value_aliasing_reaches_outputs() {
        let mut info = info("ns::op(Tensor(a!) x, Tensor y) -> Tensor(a!)");
        let (y, out) = (SchemaArgument::input(1), SchemaArgument::output(0));
        assert!(!info.are_aliasing(y, out).unwrap());

        info.add_argument_values(vec![Some(StorageId(7).into()), Some(StorageId(7).into())])
            .unwrap();
        assert!(info.is_mutating("y").unwrap());
        assert!(info.are_aliasing(SchemaArgument::input(0), out).unwrap());
        assert!(info.are_aliasing(y, out).unwrap());
        assert!(info.are_aliasing(out, y).unwrap());
    }

    // --- Determinism ---

    #[test]
    fn test_is_deterministic() {
        assert!(info(SUB_).is_deterministic());
        assert!(!info(DROPOUT).is_deterministic());
        assert!(!info("aten::randn(SymInt[] size) -> Tensor").is_deterministic());
        assert!(!info("aten::bernoulli.p(Tensor self, float p=0.5) -> Tensor").is_deterministic());
    }

    #[test]
    fn test_dropout_in_eval_mode_is_deterministic() {
        let mut info = info(DROPOUT);
        info.add_argument_value("train", false).unwrap();
        assert!(info.is_deterministic());
        info.add_named_argument_values([("train", ArgumentValue::Bool(true))]).unwrap();
        assert!(!info.is_deterministic());
    }

    #[test]
    fn test_determinism_agrees_across_instances() {
        for schema in [SUB_, SPLIT, DROPOUT] {
            assert_eq!(info(schema).is_deterministic(), info(schema).is_deterministic());
        }
    }

    #[test]
    fn test_custom_registry() {
        let registry = leaked(RegistryConfig {
            nondeterministic: vec![NondeterministicOp::always("my::sample")],
            training_ops: vec![TrainingOp::new("my::norm", "train", &["stats"])],
        });

        let sample = SchemaInfo::with_registry("my::sample(Tensor x) -> Tensor", registry).unwrap();
        assert!(!sample.is_deterministic());
        // The built-in dropout entry is not part of this registry.
        assert!(SchemaInfo::with_registry(DROPOUT, registry).unwrap().is_deterministic());

        let norm_schema = "my::norm(Tensor x, Tensor stats, bool train) -> Tensor";
        let norm = SchemaInfo::with_registry(norm_schema, registry).unwrap();
        assert!(norm.is_mutating("stats").unwrap());
    }

    // --- Argument values ---

    #[test]
    fn test_value_errors_leave_state_untouched() {
        let mut info = info(DROPOUT);
        let err = info
            .add_named_argument_values([
                ("train", ArgumentValue::Bool(false)),
                ("nope", ArgumentValue::None),
            ])
            .unwrap_err();
        assert_eq!(err, InvalidArgument::UnknownName { name: "nope".into() });
        assert!(!info.is_deterministic());

        let err = info.add_argument_values(vec![None, None, None, None]).unwrap_err();
        assert_eq!(err, InvalidArgument::TooManyValues { given: 4, len: 3 });
        assert!(info.add_argument_value("missing", true).is_err());
    }

    // --- Construction ---

    #[test]
    fn test_construction_fails_on_bad_schema() {
        assert!(SchemaInfo::new("aten::sub_.Tensor(Tensor(a!) self").is_err());
        assert!("not a schema".parse::<SchemaInfo>().is_err());
    }

    #[test]
    fn test_accessors() {
        let info: SchemaInfo = SUB_.parse().unwrap();
        assert_eq!(info.num_inputs(), 3);
        assert_eq!(info.num_outputs(), 1);
        assert!(info.has_argument("alpha"));
        assert!(!info.has_argument("beta"));

        let json: serde_json::Value =
            serde_json::from_str(&info.signature_json().unwrap()).unwrap();
        assert_eq!(json["name"]["name"], "sub_");
        assert_eq!(json["inputs"][0]["alias"]["kind"], "concrete");
        assert_eq!(json["inputs"][0]["alias"]["is_write"], true);
    }

    #[test]
    fn test_from_parsed_signature() {
        let signature = schema::parse(SUB_).unwrap();
        let alpha = signature.input("alpha").unwrap();
        assert!(alpha.has_default());
        assert!(alpha.kwarg_only);
        assert!(!signature.input("other").unwrap().has_default());
        assert!(signature.input("beta").is_none());

        let info = SchemaInfo::from_signature(signature);
        assert!(info.is_mutating("self").unwrap());
        assert!(!info.is_mutating("alpha").unwrap());
        assert!(info.is_deterministic());
    }

    #[test]
    fn test_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaInfo>();

        let info = info(SUB_);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    assert!(info.is_mutating(0).unwrap());
                    let (input, output) = (SchemaArgument::input(0), SchemaArgument::output(0));
                    assert!(info.are_aliasing(input, output).unwrap());
                    assert!(info.is_deterministic());
                });
            }
        });
    }
}
