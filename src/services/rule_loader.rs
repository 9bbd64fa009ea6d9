use crate::config::{ActionConfig, AtomRef, RuleConfig};
use crate::error::{Result, XpropError};
use crate::events::{Atom, WindowGeometry};
use crate::mappings::{atoms, PredefinedAtoms};
use crate::services::actions::{Action, PropertyFormat, PropertyMode, PropertyWrite};
use crate::services::rule_table::ClassPath;
use crate::services::transport::Transport;
use crate::xprop_error;
use tracing::{debug, warn};

/// Правило, готовое для `Session::add_rule`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRule {
    pub labels: Vec<String>,
    pub actions: Vec<Action>,
}

/// Проверить правило из конфигурации и разрешить имена атомов
pub fn load_rule<T: Transport>(rule: &RuleConfig, transport: &mut T) -> Result<LoadedRule> {
    let path = ClassPath::parse(&rule.class)?;
    if rule.actions.is_empty() {
        return Err(xprop_error!(malformed_rule, "правило '{}' без действий", path));
    }

    let mut actions = Vec::with_capacity(rule.actions.len());
    for (i, action) in rule.actions.iter().enumerate() {
        let action = load_action(action, transport).map_err(|e| match e {
            XpropError::MalformedRule(msg) => {
                xprop_error!(malformed_rule, "'{}', действие #{}: {}", path, i + 1, msg)
            }
            other => other,
        })?;
        actions.push(action);
    }

    debug!("Правило '{}' загружено: {} действий", path, actions.len());
    Ok(LoadedRule {
        labels: path.labels().to_vec(),
        actions,
    })
}

fn load_action<T: Transport>(config: &ActionConfig, transport: &mut T) -> Result<Action> {
    let action = match config.action.as_str() {
        "set_property" => Action::SetProperty(load_property_write(config, transport)?),
        "map" => Action::Map,
        "unmap" => Action::Unmap,
        "remap" => Action::Remap,
        "clear_properties" => Action::ClearProperties,
        "configure" => Action::Configure(WindowGeometry {
            x: config.x.unwrap_or(0),
            y: config.y.unwrap_or(0),
            width: config.width.unwrap_or(0),
            height: config.height.unwrap_or(0),
        }),
        "override_redirect" => Action::OverrideRedirect(config.enabled.unwrap_or(true)),
        other => return Err(xprop_error!(malformed_rule, "неизвестное действие '{}'", other)),
    };
    Ok(action)
}

fn load_property_write<T: Transport>(config: &ActionConfig, transport: &mut T) -> Result<PropertyWrite> {
    let property = config
        .property
        .as_ref()
        .ok_or_else(|| xprop_error!(malformed_rule, "set_property без property"))?;
    let data = config
        .data
        .as_ref()
        .ok_or_else(|| xprop_error!(malformed_rule, "set_property без data"))?
        .to_bytes();

    let mode = match config.mode.as_deref() {
        None => PropertyMode::Replace,
        Some(value) => PropertyMode::parse(value)
            .ok_or_else(|| xprop_error!(malformed_rule, "неверный mode '{}'", value))?,
    };

    let format = match config.format {
        None => PropertyFormat::Eight,
        Some(bits) => PropertyFormat::from_bits(bits)
            .ok_or_else(|| xprop_error!(malformed_rule, "неверный format {}", bits))?,
    };

    // Имена атомов разрешаются только после проверки всего остального
    let type_ = match &config.type_ {
        None => atoms::STRING,
        Some(reference) => resolve_atom(reference, transport)?,
    };

    if type_ != atoms::ATOM && data.len() % format.unit() != 0 {
        return Err(xprop_error!(
            malformed_rule,
            "{} байт данных не кратно формату {}",
            data.len(),
            format.bits()
        ));
    }

    let property = resolve_atom(property, transport)?;

    Ok(PropertyWrite {
        mode,
        property,
        type_,
        format,
        data,
    })
}

/// Номер как есть, предопределённое имя из таблицы, остальное через InternAtom
fn resolve_atom<T: Transport>(reference: &AtomRef, transport: &mut T) -> Result<Atom> {
    match reference {
        AtomRef::Id(atom) => Ok(*atom),
        AtomRef::Name(name) => {
            if let Some(atom) = PredefinedAtoms::lookup(name) {
                return Ok(atom);
            }
            match transport.intern_atom(name)? {
                Some(atom) => Ok(atom),
                None => {
                    warn!("Не удалось получить атом '{}', используем NONE", name);
                    Ok(atoms::NONE)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PropertyData;
    use crate::services::transport::fake::FakeTransport;

    fn rule(class: &str, actions: Vec<ActionConfig>) -> RuleConfig {
        RuleConfig {
            class: class.to_string(),
            actions,
        }
    }

    fn action(name: &str) -> ActionConfig {
        ActionConfig {
            action: name.to_string(),
            ..ActionConfig::default()
        }
    }

    fn set_property(property: AtomRef, data: PropertyData) -> ActionConfig {
        ActionConfig {
            property: Some(property),
            data: Some(data),
            ..action("set_property")
        }
    }

    fn is_malformed<T: std::fmt::Debug>(result: Result<T>) -> bool {
        matches!(result, Err(XpropError::MalformedRule(_)))
    }

    #[test]
    fn test_load_simple_actions() {
        let mut transport = FakeTransport::new();
        let loaded = load_rule(
            &rule(
                "Outer.Inner",
                vec![
                    action("map"),
                    action("unmap"),
                    action("remap"),
                    action("clear_properties"),
                    ActionConfig {
                        x: Some(-5),
                        height: Some(300),
                        ..action("configure")
                    },
                    ActionConfig {
                        enabled: Some(false),
                        ..action("override_redirect")
                    },
                ],
            ),
            &mut transport,
        )
        .unwrap();

        assert_eq!(loaded.labels, vec!["Outer".to_string(), "Inner".to_string()]);
        assert_eq!(
            loaded.actions,
            vec![
                Action::Map,
                Action::Unmap,
                Action::Remap,
                Action::ClearProperties,
                Action::Configure(WindowGeometry { x: -5, y: 0, width: 0, height: 300 }),
                Action::OverrideRedirect(false),
            ]
        );
    }

    #[test]
    fn test_set_property_defaults_and_atom_resolution() {
        let mut transport = FakeTransport::new();
        let loaded = load_rule(
            &rule(
                "App",
                vec![
                    set_property(AtomRef::Name("WM_NAME".to_string()), PropertyData::Text("hi".to_string())),
                    ActionConfig {
                        type_: Some(AtomRef::Name("ATOM".to_string())),
                        format: Some(32),
                        mode: Some("append".to_string()),
                        ..set_property(
                            AtomRef::Name("_NET_WM_STATE".to_string()),
                            PropertyData::Text("_NET_WM_STATE_ABOVE".to_string()),
                        )
                    },
                ],
            ),
            &mut transport,
        )
        .unwrap();

        assert_eq!(
            loaded.actions[0],
            Action::SetProperty(PropertyWrite {
                mode: PropertyMode::Replace,
                property: atoms::WM_NAME,
                type_: atoms::STRING,
                format: PropertyFormat::Eight,
                data: b"hi".to_vec(),
            })
        );
        let net_wm_state = transport.atoms["_NET_WM_STATE"];
        assert_eq!(
            loaded.actions[1],
            Action::SetProperty(PropertyWrite {
                mode: PropertyMode::Append,
                property: net_wm_state,
                type_: atoms::ATOM,
                format: PropertyFormat::ThirtyTwo,
                data: b"_NET_WM_STATE_ABOVE".to_vec(),
            })
        );
    }

    #[test]
    fn test_intern_failure_resolves_to_none() {
        let mut transport = FakeTransport::new();
        transport.refuse_interning = true;
        let loaded = load_rule(
            &rule("App", vec![set_property(AtomRef::Name("_CUSTOM".to_string()), PropertyData::Bytes(vec![1]))]),
            &mut transport,
        )
        .unwrap();

        match &loaded.actions[0] {
            Action::SetProperty(write) => assert_eq!(write.property, atoms::NONE),
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_rules_rejected() {
        let mut transport = FakeTransport::new();
        let text = || PropertyData::Text("abc".to_string());
        let property = || AtomRef::Id(atoms::WM_NAME);

        assert!(is_malformed(load_rule(&rule("", vec![action("map")]), &mut transport)));
        assert!(is_malformed(load_rule(&rule("A..B", vec![action("map")]), &mut transport)));
        assert!(is_malformed(load_rule(&rule("A", vec![]), &mut transport)));
        assert!(is_malformed(load_rule(&rule("A", vec![action("raise")]), &mut transport)));
        assert!(is_malformed(load_rule(
            &rule("A", vec![ActionConfig { data: Some(text()), ..action("set_property") }]),
            &mut transport
        )));
        assert!(is_malformed(load_rule(
            &rule("A", vec![ActionConfig { property: Some(property()), ..action("set_property") }]),
            &mut transport
        )));
        assert!(is_malformed(load_rule(
            &rule("A", vec![ActionConfig { mode: Some("insert".to_string()), ..set_property(property(), text()) }]),
            &mut transport
        )));
        assert!(is_malformed(load_rule(
            &rule("A", vec![ActionConfig { format: Some(12), ..set_property(property(), text()) }]),
            &mut transport
        )));
        assert!(is_malformed(load_rule(
            &rule("A", vec![ActionConfig { format: Some(32), ..set_property(property(), text()) }]),
            &mut transport
        )));
    }
}
