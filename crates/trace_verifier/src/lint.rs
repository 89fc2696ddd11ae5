use std::collections::BTreeSet;

use expr_eval::SafeEvaluator;
use trace_model::Step;

/// Advisory check of `formula` annotations: each right-hand side must parse
/// under the restricted grammar and reference only variables bound by
/// earlier steps. Warnings never affect execution or rewards.
pub fn lint_formulas(steps: &[Step]) -> Vec<String> {
    let evaluator = SafeEvaluator::new();
    let mut known: BTreeSet<String> = BTreeSet::new();
    let mut warnings = Vec::new();

    for (i, step) in steps.iter().enumerate() {
        if let Step::Formula { expression } = step {
            let (target, body) = match expression.split_once('=') {
                Some((lhs, rhs)) => (Some(lhs.trim().to_string()), rhs),
                None => (None, expression.as_str()),
            };
            if let Err(err) = evaluator.validate(body, Some(&known)) {
                warnings.push(format!("step {i}: formula: {err}"));
            }
            if let Some(target) = target {
                known.insert(target);
            }
        } else {
            bind_names(step, &mut known);
        }
    }
    warnings
}

fn bind_names(step: &Step, known: &mut BTreeSet<String>) {
    match step {
        Step::Init { var, .. } | Step::Query { var } => {
            known.insert(var.clone());
        }
        Step::Given { values } => {
            known.extend(values.keys().cloned());
        }
        Step::Compute { var, .. }
        | Step::Compare { var, .. }
        | Step::PercentOff { var, .. }
        | Step::PercentIncrease { var, .. }
        | Step::PercentOf { var, .. } => {
            if let Some(var) = var {
                known.insert(var.clone());
            }
        }
        Step::Transfer { from, to, .. } => {
            known.insert(from.clone());
            known.insert(to.clone());
        }
        Step::Consume { entity, .. } | Step::AddEntity { entity, .. } => {
            known.insert(entity.clone());
        }
        Step::Search { var, .. } | Step::Evaluate { var, .. } => {
            known.insert(var.clone());
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(text: &str) -> Vec<Step> {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn well_formed_formula_passes() {
        let trace = steps(
            r#"[
                {"given": {"values": {"speed": 60, "time": 2}}},
                {"formula": {"expression": "distance = speed * time"}}
            ]"#,
        );
        assert!(lint_formulas(&trace).is_empty());
    }

    #[test]
    fn unknown_variable_is_flagged() {
        let trace = steps(r#"[{"formula": {"expression": "d = speed * time"}}]"#);
        let warnings = lint_formulas(&trace);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0], "step 0: formula: unknown variables: speed, time");
    }

    #[test]
    fn earlier_formula_target_counts_as_bound() {
        let trace = steps(
            r#"[
                {"given": {"values": {"a": 1}}},
                {"formula": {"expression": "b = a + 1"}},
                {"formula": {"expression": "c = b * 2"}}
            ]"#,
        );
        assert!(lint_formulas(&trace).is_empty());
    }

    #[test]
    fn function_calls_are_flagged() {
        let trace = steps(r#"[{"formula": {"expression": "x = sqrt(4)"}}]"#);
        let warnings = lint_formulas(&trace);
        assert_eq!(
            warnings,
            vec!["step 0: formula: unsupported expression: function call".to_string()]
        );
    }
}
