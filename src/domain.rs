//! Domain models used by the backend: the problem record and its verb metadata.
//!
//! Field names on the wire are camelCase; closed sets (person, tense, mood, type)
//! are enums so unknown values fail at decode time.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// How the problem is presented to the learner.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ProblemType {
  /// Fill in the blank.
  Cloze,
  /// Pick one of four `options`.
  MultipleChoice,
}

impl ProblemType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ProblemType::Cloze => "cloze",
      ProblemType::MultipleChoice => "multipleChoice",
    }
  }
}

/// Grammatical person: 1st/2nd/3rd, singular/plural.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Person {
  #[serde(rename = "1s")] FirstSingular,   // yo
  #[serde(rename = "2s")] SecondSingular,  // tú
  #[serde(rename = "3s")] ThirdSingular,   // él, ella, usted
  #[serde(rename = "1p")] FirstPlural,     // nosotros, nosotras
  #[serde(rename = "2p")] SecondPlural,    // vosotros, vosotras
  #[serde(rename = "3p")] ThirdPlural,     // ellos, ellas, ustedes
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Tense {
  Present,
  Preterite,
  Imperfect,
  Future,
  Conditional,
  PresentPerfect,
  Pluperfect,
  FuturePerfect,
  ConditionalPerfect,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Mood {
  Indicative,
  Subjunctive,
  Imperative,
}

/// The graded answer: conjugated form plus its grammatical coordinates.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VerbSolution {
  /// e.g. "hablé"
  pub conjugated: String,
  /// e.g. "hablar"
  pub infinitive: String,
  pub person: Person,
  pub tense: Tense,
  pub mood: Mood,
}

/// Display/grading aid: the sentence with the verb in place.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerbContext {
  pub full_sentence: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub translation: Option<String>,
  /// Offset of the verb in the tokenized sentence.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub verb_index: Option<u32>,
}

/// Corpus frequency ranks. Lower = more common.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerbFrequency {
  pub infinitive_rank: u32,
  pub form_rank: u32,
}

/// A single conjugation problem as stored and served.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: ProblemType,
  pub elo: f64,
  /// Sentence with the target verb replaced by a blank.
  pub sentence: String,
  pub solution: VerbSolution,
  pub context: VerbContext,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<[String; 4]>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub frequency: Option<VerbFrequency>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub difficulty: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tags: Option<Vec<String>>,
}

/// Reasons a record is refused at ingestion time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidProblem {
  #[error("field `{0}` must not be empty")]
  EmptyField(&'static str),
  #[error("elo must be a finite number")]
  NonFiniteElo,
  #[error("multipleChoice problem has no options")]
  MissingOptions,
  #[error("options must be four distinct strings")]
  DuplicateOptions,
  #[error("options do not contain the solution `{0}`")]
  SolutionNotInOptions(String),
}

impl Problem {
  /// Authoring checks applied when records enter a store. The read path trusts stored data.
  pub fn validate(&self) -> Result<(), InvalidProblem> {
    let required = [
      ("id", &self.id),
      ("sentence", &self.sentence),
      ("solution.conjugated", &self.solution.conjugated),
      ("solution.infinitive", &self.solution.infinitive),
      ("context.fullSentence", &self.context.full_sentence),
    ];
    for (name, value) in required {
      if value.trim().is_empty() {
        return Err(InvalidProblem::EmptyField(name));
      }
    }
    if !self.elo.is_finite() {
      return Err(InvalidProblem::NonFiniteElo);
    }

    match (&self.options, self.kind) {
      (None, ProblemType::MultipleChoice) => Err(InvalidProblem::MissingOptions),
      (None, ProblemType::Cloze) => Ok(()),
      (Some(options), _) => {
        let distinct: HashSet<&str> = options.iter().map(String::as_str).collect();
        if distinct.len() != options.len() {
          return Err(InvalidProblem::DuplicateOptions);
        }
        if !distinct.contains(self.solution.conjugated.as_str()) {
          return Err(InvalidProblem::SolutionNotInOptions(self.solution.conjugated.clone()));
        }
        Ok(())
      }
    }
  }
}
