//! Selection reporting.

use std::fmt;

use crate::selection::SelectionInfo;

/// The selections in effect for a graph, plus any inconsistencies met while
/// collecting them.
#[derive(Debug, Default)]
pub struct SelectionReport {
    pub selections: Vec<SelectionInfo>,
    pub inconsistencies: Vec<String>,
}

impl SelectionReport {
    pub fn new(selections: Vec<SelectionInfo>, inconsistencies: Vec<String>) -> Self {
        Self {
            selections,
            inconsistencies,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty() && self.inconsistencies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }
}

impl fmt::Display for SelectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No version selections.");
        }
        if !self.selections.is_empty() {
            writeln!(f, "Version selections ({}):", self.selections.len())?;
            for s in &self.selections {
                writeln!(f, "  {s}")?;
            }
        }
        if !self.inconsistencies.is_empty() {
            writeln!(f, "Inconsistencies ({}):", self.inconsistencies.len())?;
            for i in &self.inconsistencies {
                writeln!(f, "  {i}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for SelectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} (edge {} replaced by {})",
            self.variable_target, self.selected_target, self.variable_edge, self.selected_edge
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::refs::ProjectVersionRef;

    #[test]
    fn empty_report() {
        let report = SelectionReport::default();
        assert!(report.is_empty());
        assert_eq!(report.len(), 0);
        assert_eq!(report.to_string(), "No version selections.");
    }

    #[test]
    fn report_with_selections() {
        let report = SelectionReport::new(
            vec![SelectionInfo {
                variable_target: ProjectVersionRef::parse("org.example:lib:[1.0,2.0)").unwrap(),
                variable_edge: 3,
                selected_target: ProjectVersionRef::parse("org.example:lib:1.5").unwrap(),
                selected_edge: 7,
            }],
            vec!["Inconsistent graph state: vertex 9 has a selected relationship with no counterpart".into()],
        );
        assert!(!report.is_empty());
        assert_eq!(report.len(), 1);
        let s = report.to_string();
        assert!(s.contains("Version selections (1):"));
        assert!(s.contains("org.example:lib:[1.0,2.0) -> org.example:lib:1.5"));
        assert!(s.contains("Inconsistencies (1):"));
    }
}
