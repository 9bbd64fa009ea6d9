use crate::error::{Result, XpropError};
use crate::services::actions::Action;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

/// Путь по классам окон: "Outer.Inner.Leaf"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassPath(Vec<String>);

impl ClassPath {
    pub fn new(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return XpropError::malformed_rule("пустой путь классов");
        }
        if let Some(index) = labels.iter().position(|label| label.is_empty()) {
            return XpropError::malformed_rule(format!("пустая метка #{} в пути классов", index + 1));
        }
        Ok(Self(labels))
    }

    /// Разобрать путь, разделённый точками
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() {
            return XpropError::malformed_rule("пустой путь классов");
        }
        Self::new(value.split('.').map(str::to_string).collect())
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn label(&self, depth: usize) -> Option<&str> {
        self.0.get(depth).map(String::as_str)
    }

    pub fn is_last(&self, depth: usize) -> bool {
        depth + 1 == self.0.len()
    }
}

impl fmt::Display for ClassPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Правило: путь классов и упорядоченный список действий
#[derive(Debug, Clone)]
pub struct Rule {
    pub path: ClassPath,
    pub actions: Vec<Action>,
}

/// Таблица правил. Только добавление; порядок вставки сохраняется.
#[derive(Debug, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
    index: HashMap<ClassPath, usize>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: ClassPath, actions: Vec<Action>) -> Result<()> {
        if actions.is_empty() {
            return XpropError::malformed_rule(format!("правило '{}' без действий", path));
        }

        match self.index.get(&path) {
            Some(&slot) => {
                info!("Дополняем правило '{}' ещё {} действиями", path, actions.len());
                self.rules[slot].actions.extend(actions);
            }
            None => {
                info!("Новое правило '{}' ({} действий)", path, actions.len());
                self.index.insert(path.clone(), self.rules.len());
                self.rules.push(Rule { path, actions });
            }
        }
        Ok(())
    }

    pub fn get(&self, slot: usize) -> Option<&Rule> {
        self.rules.get(slot)
    }

    #[cfg(test)]
    pub fn find(&self, path: &ClassPath) -> Option<&Rule> {
        self.index.get(path).and_then(|&slot| self.rules.get(slot))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(value: &str) -> ClassPath {
        ClassPath::parse(value).unwrap()
    }

    #[test]
    fn test_parse_class_path() {
        let parsed = path("Outer.Inner");
        assert_eq!(parsed.labels(), &["Outer".to_string(), "Inner".to_string()]);
        assert_eq!(parsed.labels().len(), 2);
        assert!(parsed.is_last(1));
        assert!(!parsed.is_last(0));
        assert_eq!(parsed.to_string(), "Outer.Inner");
    }

    #[test]
    fn test_parse_rejects_empty_labels() {
        assert!(matches!(ClassPath::parse(""), Err(XpropError::MalformedRule(_))));
        assert!(matches!(ClassPath::parse("a..b"), Err(XpropError::MalformedRule(_))));
        assert!(matches!(ClassPath::parse("a."), Err(XpropError::MalformedRule(_))));
        assert!(matches!(ClassPath::new(vec![]), Err(XpropError::MalformedRule(_))));
    }

    #[test]
    fn test_paths_are_case_sensitive() {
        assert_ne!(path("Firefox"), path("firefox"));
    }

    #[test]
    fn test_add_rejects_empty_actions_without_mutation() {
        let mut table = RuleTable::new();
        table.add(path("A"), vec![Action::Map]).unwrap();

        let result = table.add(path("B"), vec![]);
        assert!(matches!(result, Err(XpropError::MalformedRule(_))));
        assert_eq!(table.len(), 1);
        assert!(table.find(&path("B")).is_none());
    }

    #[test]
    fn test_add_appends_to_existing_path() {
        let mut table = RuleTable::new();
        table.add(path("A.B"), vec![Action::Map]).unwrap();
        table.add(path("C"), vec![Action::Remap]).unwrap();
        table.add(path("A.B"), vec![Action::Unmap]).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.find(&path("A.B")).unwrap().actions, vec![Action::Map, Action::Unmap]);
        assert_eq!(table.get(1).unwrap().path, path("C"));
    }
}
