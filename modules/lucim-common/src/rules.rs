//! The versioned rule catalogue.
//!
//! Every rule id the auditors can emit lives in [`RuleId`], and its stable
//! string id, artifact family and default message live in exactly one place:
//! [`RuleId::definition`]. Renaming an id is a breaking change for every
//! consumer that matches on it; bump [`RULE_CATALOGUE_VERSION`] when doing so.

use std::fmt;
use std::str::FromStr;

use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AuditError;

pub const RULE_CATALOGUE_VERSION: u32 = 1;

/// Which artifact a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    OperationModel,
    Scenario,
    Diagram,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::OperationModel => write!(f, "operation_model"),
            Artifact::Scenario => write!(f, "scenario"),
            Artifact::Diagram => write!(f, "diagram"),
        }
    }
}

/// Static description of one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleDefinition {
    pub id: &'static str,
    pub applies_to: Artifact,
    pub message: &'static str,
}

const fn rule(id: &'static str, applies_to: Artifact, message: &'static str) -> RuleDefinition {
    RuleDefinition {
        id,
        applies_to,
        message,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleId {
    // --- Operation model ---
    Lom0JsonBlockOnly,
    Lom1ActTypeFormat,
    Lom2IeEventNameFormat,
    Lom3OeEventNameFormat,
    Lom4IeEventDirection,
    Lom5OeEventDirection,
    Lom6ConditionsDefinition,
    Lom7ConditionsValidation,
    Lom10SysUnique,
    Lom11SysNoSelfLoop,
    Lom12ActNoActEvents,
    Lom13SysActAllowedEvents,
    Lom14EventParametersFormat,
    LomFormatError,

    // --- Scenario ---
    Lsc0JsonBlockOnly,
    Lsc1MessageDirectionality,
    Lsc2ActorsLimitation,
    Lsc3InputEventsLimitation,
    Lsc4OutputEventsLimitation,
    Lsc5EventSequence,
    Lsc6ParametersValue,
    Lsc7SystemNoSelfLoop,
    Lsc8ActorNoSelfLoop,
    Lsc9InputEventAllowedEvents,
    Lsc10OutputEventDirection,
    Lsc11ActorInstanceFormat,
    Lsc12ActorTypeNameConsistency,
    Lsc13ActorInstanceConsistency,
    Lsc14InputEventNameConsistency,
    Lsc15OutputEventNameConsistency,
    Lsc16ActorsPersistence,
    Lsc17EventsPersistence,
    Lsc18EventArrowSyntax,
    LscFormatError,

    // --- Diagram ---
    Ldr0PlantumlBlockOnly,
    Ldr1SysUnique,
    Ldr2ActorDeclaredAfterSystem,
    Ldr3SystemDeclaredFirst,
    Ldr4EventDirectionality,
    Ldr5SystemNoSelfLoop,
    Ldr6ActorNoActorLoop,
    Ldr7ActivationBarSequence,
    Ldr8ActivationBarNestingForbidden,
    Ldr9ActivationBarOverlappingForbidden,
    Ldr10ActivationBarOnSystemForbidden,
    Ldr11SystemShape,
    Ldr12SystemColor,
    Ldr13ActorShape,
    Ldr14ActorColor,
    Ldr15ActivationBarInputEventColor,
    Ldr16ActivationBarOutputEventColor,
    Ldr17ActorDeclarationSyntax,
    Ldr20ActivationBarSequence,
    Ldr23EventParameterCommaSeparated,
    Ldr24SystemDeclaration,
    Ldr25InputEventSyntax,
    Ldr26OutputEventSyntax,
    Ldr27ActorInstanceFormat,
    Ldr28ActorInstanceNameConsistency,
    LdrFormatError,
}

use Artifact::{Diagram, OperationModel, Scenario};

impl RuleId {
    pub const ALL: &'static [RuleId] = &[
        RuleId::Lom0JsonBlockOnly,
        RuleId::Lom1ActTypeFormat,
        RuleId::Lom2IeEventNameFormat,
        RuleId::Lom3OeEventNameFormat,
        RuleId::Lom4IeEventDirection,
        RuleId::Lom5OeEventDirection,
        RuleId::Lom6ConditionsDefinition,
        RuleId::Lom7ConditionsValidation,
        RuleId::Lom10SysUnique,
        RuleId::Lom11SysNoSelfLoop,
        RuleId::Lom12ActNoActEvents,
        RuleId::Lom13SysActAllowedEvents,
        RuleId::Lom14EventParametersFormat,
        RuleId::LomFormatError,
        RuleId::Lsc0JsonBlockOnly,
        RuleId::Lsc1MessageDirectionality,
        RuleId::Lsc2ActorsLimitation,
        RuleId::Lsc3InputEventsLimitation,
        RuleId::Lsc4OutputEventsLimitation,
        RuleId::Lsc5EventSequence,
        RuleId::Lsc6ParametersValue,
        RuleId::Lsc7SystemNoSelfLoop,
        RuleId::Lsc8ActorNoSelfLoop,
        RuleId::Lsc9InputEventAllowedEvents,
        RuleId::Lsc10OutputEventDirection,
        RuleId::Lsc11ActorInstanceFormat,
        RuleId::Lsc12ActorTypeNameConsistency,
        RuleId::Lsc13ActorInstanceConsistency,
        RuleId::Lsc14InputEventNameConsistency,
        RuleId::Lsc15OutputEventNameConsistency,
        RuleId::Lsc16ActorsPersistence,
        RuleId::Lsc17EventsPersistence,
        RuleId::Lsc18EventArrowSyntax,
        RuleId::LscFormatError,
        RuleId::Ldr0PlantumlBlockOnly,
        RuleId::Ldr1SysUnique,
        RuleId::Ldr2ActorDeclaredAfterSystem,
        RuleId::Ldr3SystemDeclaredFirst,
        RuleId::Ldr4EventDirectionality,
        RuleId::Ldr5SystemNoSelfLoop,
        RuleId::Ldr6ActorNoActorLoop,
        RuleId::Ldr7ActivationBarSequence,
        RuleId::Ldr8ActivationBarNestingForbidden,
        RuleId::Ldr9ActivationBarOverlappingForbidden,
        RuleId::Ldr10ActivationBarOnSystemForbidden,
        RuleId::Ldr11SystemShape,
        RuleId::Ldr12SystemColor,
        RuleId::Ldr13ActorShape,
        RuleId::Ldr14ActorColor,
        RuleId::Ldr15ActivationBarInputEventColor,
        RuleId::Ldr16ActivationBarOutputEventColor,
        RuleId::Ldr17ActorDeclarationSyntax,
        RuleId::Ldr20ActivationBarSequence,
        RuleId::Ldr23EventParameterCommaSeparated,
        RuleId::Ldr24SystemDeclaration,
        RuleId::Ldr25InputEventSyntax,
        RuleId::Ldr26OutputEventSyntax,
        RuleId::Ldr27ActorInstanceFormat,
        RuleId::Ldr28ActorInstanceNameConsistency,
        RuleId::LdrFormatError,
    ];

    /// Scenario rules that cross-reference an operation model.
    pub const SCENARIO_MODEL_RULES: &'static [RuleId] = &[
        RuleId::Lsc5EventSequence,
        RuleId::Lsc6ParametersValue,
        RuleId::Lsc12ActorTypeNameConsistency,
        RuleId::Lsc13ActorInstanceConsistency,
        RuleId::Lsc14InputEventNameConsistency,
        RuleId::Lsc15OutputEventNameConsistency,
        RuleId::Lsc16ActorsPersistence,
        RuleId::Lsc17EventsPersistence,
    ];

    /// Diagram rules that can only be judged on a rendered image.
    pub const DIAGRAM_GRAPHICAL_RULES: &'static [RuleId] = &[
        RuleId::Ldr11SystemShape,
        RuleId::Ldr12SystemColor,
        RuleId::Ldr13ActorShape,
        RuleId::Ldr14ActorColor,
        RuleId::Ldr15ActivationBarInputEventColor,
        RuleId::Ldr16ActivationBarOutputEventColor,
    ];

    pub fn definition(self) -> RuleDefinition {
        match self {
            RuleId::Lom0JsonBlockOnly => rule(
                "LOM0-JSON-BLOCK-ONLY",
                OperationModel,
                "The Operation Model must be solely a JSON block: no Markdown fences and no text outside the JSON object.",
            ),
            RuleId::Lom1ActTypeFormat => rule(
                "LOM1-ACT-TYPE-FORMAT",
                OperationModel,
                "Actor type name must be FirstCapitalLetterFormat and prefixed by \"Act\".",
            ),
            RuleId::Lom2IeEventNameFormat => rule(
                "LOM2-IE-EVENT-NAME-FORMAT",
                OperationModel,
                "All input event names must be human-readable, in camelCase.",
            ),
            RuleId::Lom3OeEventNameFormat => rule(
                "LOM3-OE-EVENT-NAME-FORMAT",
                OperationModel,
                "All output event names must be human-readable, in camelCase.",
            ),
            RuleId::Lom4IeEventDirection => rule(
                "LOM4-IE-EVENT-DIRECTION",
                OperationModel,
                "All input events must have their source from the System and their target to an Actor.",
            ),
            RuleId::Lom5OeEventDirection => rule(
                "LOM5-OE-EVENT-DIRECTION",
                OperationModel,
                "All output events must have their source from an Actor and their target to the System.",
            ),
            RuleId::Lom6ConditionsDefinition => rule(
                "LOM6-CONDITIONS-DEFINITION",
                OperationModel,
                "Condition arrays must hold objects with a non-empty text, an allowed severity and ids unique within the array.",
            ),
            RuleId::Lom7ConditionsValidation => rule(
                "LOM7-CONDITIONS-VALIDATION",
                OperationModel,
                "postF must be present and a non-empty array; preF and preP must be arrays when provided.",
            ),
            RuleId::Lom10SysUnique => rule(
                "LOM10-SYS-UNIQUE",
                OperationModel,
                "There must be exactly one System, named exactly \"System\".",
            ),
            RuleId::Lom11SysNoSelfLoop => rule(
                "LOM11-SYS-NO-SELF-LOOP",
                OperationModel,
                "Events must never be from System to System.",
            ),
            RuleId::Lom12ActNoActEvents => rule(
                "LOM12-ACT-NO-ACT-EVENTS",
                OperationModel,
                "Events must never be from Actor to Actor.",
            ),
            RuleId::Lom13SysActAllowedEvents => rule(
                "LOM13-SYS-ACT-ALLOWED-EVENTS",
                OperationModel,
                "Only System to Actor and Actor to System events are allowed.",
            ),
            RuleId::Lom14EventParametersFormat => rule(
                "LOM14-EVENT-PARAMETERS-FORMAT",
                OperationModel,
                "Event \"parameters\" must be an array of strings or parameter descriptors (may be empty).",
            ),
            RuleId::LomFormatError => rule(
                "LOM-FORMAT-ERROR",
                OperationModel,
                "The Operation Model does not have the expected structure.",
            ),

            RuleId::Lsc0JsonBlockOnly => rule(
                "LSC0-JSON-BLOCK-ONLY",
                Scenario,
                "The Scenario must be solely a JSON block: no Markdown fences and no text outside the JSON object.",
            ),
            RuleId::Lsc1MessageDirectionality => rule(
                "LSC1-MESSAGE-DIRECTIONALITY",
                Scenario,
                "Every message must connect exactly one Actor and the System.",
            ),
            RuleId::Lsc2ActorsLimitation => rule(
                "LSC2-ACTORS-LIMITATION",
                Scenario,
                "A scenario must involve at most the allowed number of actor instances.",
            ),
            RuleId::Lsc3InputEventsLimitation => rule(
                "LSC3-INPUT-EVENTS-LIMITATION",
                Scenario,
                "Each actor instance must receive at least one input event.",
            ),
            RuleId::Lsc4OutputEventsLimitation => rule(
                "LSC4-OUTPUT-EVENTS-LIMITATION",
                Scenario,
                "Each actor instance must send at least one output event.",
            ),
            RuleId::Lsc5EventSequence => rule(
                "LSC5-EVENT-SEQUENCE",
                Scenario,
                "Every event used in a scenario must define a non-empty postF in the Operation Model.",
            ),
            RuleId::Lsc6ParametersValue => rule(
                "LSC6-PARAMETERS-VALUE",
                Scenario,
                "The number of event parameters must match the Operation Model.",
            ),
            RuleId::Lsc7SystemNoSelfLoop => rule(
                "LSC7-SYSTEM-NO-SELF-LOOP",
                Scenario,
                "System to System messages are forbidden.",
            ),
            RuleId::Lsc8ActorNoSelfLoop => rule(
                "LSC8-ACTOR-NO-SELF-LOOP",
                Scenario,
                "Actor to Actor messages are forbidden.",
            ),
            RuleId::Lsc9InputEventAllowedEvents => rule(
                "LSC9-INPUT-EVENT-ALLOWED-EVENTS",
                Scenario,
                "Input events must flow from the System to an Actor.",
            ),
            RuleId::Lsc10OutputEventDirection => rule(
                "LSC10-OUTPUT-EVENT-DIRECTION",
                Scenario,
                "Output events must flow from an Actor to the System.",
            ),
            RuleId::Lsc11ActorInstanceFormat => rule(
                "LSC11-ACTOR-INSTANCE-FORMAT",
                Scenario,
                "All actor instance names must be human-readable, in camelCase.",
            ),
            RuleId::Lsc12ActorTypeNameConsistency => rule(
                "LSC12-ACTOR-TYPE-NAME-CONSISTENCY",
                Scenario,
                "An actor type named in the scenario must be the type the Operation Model declares for that instance.",
            ),
            RuleId::Lsc13ActorInstanceConsistency => rule(
                "LSC13-ACTOR-INSTANCE-CONSISTENCY",
                Scenario,
                "An actor instance may only exchange events its actor type owns in the Operation Model.",
            ),
            RuleId::Lsc14InputEventNameConsistency => rule(
                "LSC14-INPUT-EVENT-NAME-CONSISTENCY",
                Scenario,
                "Input event names must be input events of the Operation Model.",
            ),
            RuleId::Lsc15OutputEventNameConsistency => rule(
                "LSC15-OUTPUT-EVENT-NAME-CONSISTENCY",
                Scenario,
                "Output event names must be output events of the Operation Model.",
            ),
            RuleId::Lsc16ActorsPersistence => rule(
                "LSC16-ACTORS-PERSISTENCE",
                Scenario,
                "Every actor instance must correspond to an actor type declared in the Operation Model.",
            ),
            RuleId::Lsc17EventsPersistence => rule(
                "LSC17-EVENTS-PERSISTENCE",
                Scenario,
                "Every event must be declared in the Operation Model.",
            ),
            RuleId::Lsc18EventArrowSyntax => rule(
                "LSC18-EVENT-ARROW-SYNTAX",
                Scenario,
                "Input events use a dashed arrow (-->) and output events a continuous arrow (->).",
            ),
            RuleId::LscFormatError => rule(
                "LSC-FORMAT-ERROR",
                Scenario,
                "The Scenario does not have the expected structure.",
            ),

            RuleId::Ldr0PlantumlBlockOnly => rule(
                "LDR0-PLANTUML-BLOCK-ONLY",
                Diagram,
                "The diagram must be solely a PlantUML block: no Markdown fences and no text outside @startuml/@enduml.",
            ),
            RuleId::Ldr1SysUnique => rule(
                "LDR1-SYS-UNIQUE",
                Diagram,
                "There must be exactly one System lifeline per diagram.",
            ),
            RuleId::Ldr2ActorDeclaredAfterSystem => rule(
                "LDR2-ACTOR-DECLARED-AFTER-SYSTEM",
                Diagram,
                "The actors must be declared after the System.",
            ),
            RuleId::Ldr3SystemDeclaredFirst => rule(
                "LDR3-SYSTEM-DECLARED-FIRST",
                Diagram,
                "The System must be declared first before all actors.",
            ),
            RuleId::Ldr4EventDirectionality => rule(
                "LDR4-EVENT-DIRECTIONALITY",
                Diagram,
                "Every message must connect exactly one Actor lifeline and the System lifeline.",
            ),
            RuleId::Ldr5SystemNoSelfLoop => rule(
                "LDR5-SYSTEM-NO-SELF-LOOP",
                Diagram,
                "Events must never be from System to System.",
            ),
            RuleId::Ldr6ActorNoActorLoop => rule(
                "LDR6-ACTOR-NO-ACTOR-LOOP",
                Diagram,
                "Events must never be from Actor to Actor.",
            ),
            RuleId::Ldr7ActivationBarSequence => rule(
                "LDR7-ACTIVATION-BAR-SEQUENCE",
                Diagram,
                "For each event, an activation must occur on the Actor lifeline immediately after the event.",
            ),
            RuleId::Ldr8ActivationBarNestingForbidden => rule(
                "LDR8-ACTIVATION-BAR-NESTING-FORBIDDEN",
                Diagram,
                "Activation bars must never be nested.",
            ),
            RuleId::Ldr9ActivationBarOverlappingForbidden => rule(
                "LDR9-ACTIVATION-BAR-OVERLAPPING-FORBIDDEN",
                Diagram,
                "Activation bars must never overlap.",
            ),
            RuleId::Ldr10ActivationBarOnSystemForbidden => rule(
                "LDR10-ACTIVATION-BAR-ON-SYSTEM-FORBIDDEN",
                Diagram,
                "There must be no activation bar on the System lifeline.",
            ),
            RuleId::Ldr11SystemShape => rule(
                "LDR11-SYSTEM-SHAPE",
                Diagram,
                "The System participant must be drawn as a rectangle.",
            ),
            RuleId::Ldr12SystemColor => rule(
                "LDR12-SYSTEM-COLOR",
                Diagram,
                "The System participant background must be #E8C28A.",
            ),
            RuleId::Ldr13ActorShape => rule(
                "LDR13-ACTOR-SHAPE",
                Diagram,
                "Actor participants must be drawn as rectangles.",
            ),
            RuleId::Ldr14ActorColor => rule(
                "LDR14-ACTOR-COLOR",
                Diagram,
                "Actor participant backgrounds must be #FFF3B3.",
            ),
            RuleId::Ldr15ActivationBarInputEventColor => rule(
                "LDR15-ACTIVATION-BAR-INPUT-EVENT-COLOR",
                Diagram,
                "Activation bars after input events must be #C0EBFD.",
            ),
            RuleId::Ldr16ActivationBarOutputEventColor => rule(
                "LDR16-ACTIVATION-BAR-OUTPUT-EVENT-COLOR",
                Diagram,
                "Activation bars after output events must be #274364.",
            ),
            RuleId::Ldr17ActorDeclarationSyntax => rule(
                "LDR17-ACTOR-DECLARATION-SYNTAX",
                Diagram,
                "Each actor must be declared as: participant \"anActorName:ActActorType\" as anActorName",
            ),
            RuleId::Ldr20ActivationBarSequence => rule(
                "LDR20-ACTIVATION-BAR-SEQUENCE",
                Diagram,
                "Strictly follow the sequence: event declaration, activate the participant, deactivate the participant.",
            ),
            RuleId::Ldr23EventParameterCommaSeparated => rule(
                "LDR23-EVENT-PARAMETER-COMMA-SEPARATED",
                Diagram,
                "Multiple parameters must be comma-separated without empty items.",
            ),
            RuleId::Ldr24SystemDeclaration => rule(
                "LDR24-SYSTEM-DECLARATION",
                Diagram,
                "Declare the System participant using the exact syntax: participant System as system",
            ),
            RuleId::Ldr25InputEventSyntax => rule(
                "LDR25-INPUT-EVENT-SYNTAX",
                Diagram,
                "ie events must be declared as: system --> theParticipant : ieMessageName(EP)",
            ),
            RuleId::Ldr26OutputEventSyntax => rule(
                "LDR26-OUTPUT-EVENT-SYNTAX",
                Diagram,
                "oe events must be declared as: theParticipant -> system : oeMessageName(EP)",
            ),
            RuleId::Ldr27ActorInstanceFormat => rule(
                "LDR27-ACTOR-INSTANCE-FORMAT",
                Diagram,
                "All actor instance names must be human-readable, in camelCase.",
            ),
            RuleId::Ldr28ActorInstanceNameConsistency => rule(
                "LDR28-ACTOR-INSTANCE-NAME-CONSISTENCY",
                Diagram,
                "Actor instances must be consistent with the actor types of the Operation Model.",
            ),
            RuleId::LdrFormatError => rule(
                "LDR-FORMAT-ERROR",
                Diagram,
                "The diagram does not contain any PlantUML content.",
            ),
        }
    }

    /// Stable string id, e.g. `LOM7-CONDITIONS-VALIDATION`.
    pub fn as_str(self) -> &'static str {
        self.definition().id
    }

    pub fn applies_to(self) -> Artifact {
        self.definition().applies_to
    }

    pub fn message(self) -> &'static str {
        self.definition().message
    }

    /// Rules in the catalogue that apply to `artifact`, in catalogue order.
    pub fn for_artifact(artifact: Artifact) -> impl Iterator<Item = RuleId> {
        RuleId::ALL
            .iter()
            .copied()
            .filter(move |r| r.applies_to() == artifact)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleId {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        RuleId::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| AuditError::UnknownRule(wanted.to_string()))
    }
}

impl Serialize for RuleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RuleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for RuleId {
    fn schema_name() -> String {
        "RuleId".to_string()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            enum_values: Some(
                RuleId::ALL
                    .iter()
                    .map(|r| serde_json::Value::from(r.as_str()))
                    .collect(),
            ),
            ..Default::default()
        }
        .into()
    }
}
