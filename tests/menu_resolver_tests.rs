//! メニュー/アクションツリー解決の結合テスト

use std::rc::Rc;

use scribe::action::{ActionContext, ActionFactories, ActionHandler, CommandResult};
use scribe::config::Config;
use scribe::error::{ActionError, Result};
use scribe::input::Accelerator;
use scribe::menu::{
    ConfigChangeEvent, ConfigChangeListener, DocTypeSpec, KeybindingChange, MenuNode,
    MenuResolver, NodeKind, PopupKind, TargetKind, ToolSpec,
};

struct Greeter;

impl ActionHandler for Greeter {
    fn perform(&mut self, _ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
        Ok(CommandResult::success_with_message("hello"))
    }
}

fn plugin_factories() -> ActionFactories {
    let mut factories = ActionFactories::new();
    factories.register_custom("plugins.Greeter", |_node| Ok(Box::new(Greeter) as Box<dyn ActionHandler>));
    factories.register_custom("plugins.Broken", |node| {
        Err(ActionError::Construction {
            target: "plugins.Broken".to_string(),
            message: format!("{} is not supported", node.id),
        })
    });
    factories
}

/// 深さ3以上、種別が混在したツリー
fn mixed_tree() -> MenuNode {
    MenuNode::root()
        .with_child(
            MenuNode::new("plugins", NodeKind::Menu)
                .with_child(
                    MenuNode::new("plugins.greet", NodeKind::Item)
                        .with_target(TargetKind::Custom, "plugins.Greeter")
                        .with_accelerator("C-g"),
                )
                .with_child(
                    MenuNode::new("plugins.broken", NodeKind::Item)
                        .with_target(TargetKind::Custom, "plugins.Broken"),
                )
                .with_child(MenuNode::separator("plugins.sep"))
                .with_child(
                    MenuNode::new("plugins.more", NodeKind::Menu)
                        .with_child(
                            MenuNode::new("plugins.missing", NodeKind::Item)
                                .with_target(TargetKind::Custom, "plugins.Missing"),
                        )
                        .with_child(MenuNode::new("plugins.flag", NodeKind::CheckBox))
                        .with_child(
                            MenuNode::new("plugins.deep", NodeKind::Menu).with_child(
                                MenuNode::new("plugins.deep.tool", NodeKind::CustomTool)
                                    .with_target(TargetKind::Default, "make"),
                            ),
                        ),
                ),
        )
        .with_child(
            MenuNode::new("mode", NodeKind::Menu)
                .with_child(MenuNode::new("mode.insert", NodeKind::Radio))
                .with_child(MenuNode::new("mode.overwrite", NodeKind::Radio)),
        )
}

fn builtin_resolver() -> MenuResolver {
    let config = Config::builtin().unwrap();
    let mut resolver = MenuResolver::new(config.menu)
        .unwrap()
        .with_layout(config.layout)
        .with_dynamic(config.dynamic)
        .with_recent(config.recent);
    resolver.build_all();
    resolver.load_menu_bar();
    resolver
}

#[test]
fn test_every_action_leaf_is_registered_or_omitted() {
    let tree = mixed_tree();
    let mut resolver = MenuResolver::new(tree.clone())
        .unwrap()
        .with_factories(plugin_factories());
    let report = resolver.build_all();

    let mut leaves = Vec::new();
    tree.walk(&mut |node, _| {
        if node.kind.requires_action() {
            leaves.push(node.id.clone());
        }
    });

    assert_eq!(report.visited(), leaves.len());
    for id in &leaves {
        let registered = resolver.lookup(id).is_some();
        assert!(registered != report.is_omitted(id), "{id}");
    }
    assert!(report.is_omitted("plugins.broken"));
    assert!(report.is_omitted("plugins.missing"));
    assert!(resolver.lookup("plugins.deep.tool").is_some());
}

#[test]
fn test_rebuilding_overlapping_tree_keeps_first_registration() {
    let tree = mixed_tree();
    let mut resolver = MenuResolver::new(tree.clone())
        .unwrap()
        .with_factories(plugin_factories());
    resolver.build_all();
    let greet = resolver.lookup("plugins.greet").unwrap();
    let count = resolver.registry().len();

    // 同じ親経路を持つ部分木（ポップアップ相当）
    let subtree = tree.subset("popup.plugins", &["plugins.more".to_string(), "plugins.greet".to_string()]);
    let report = resolver.build_actions(&subtree);

    assert!(report.registered.is_empty());
    assert_eq!(resolver.registry().len(), count);
    assert!(Rc::ptr_eq(&greet, &resolver.lookup("plugins.greet").unwrap()));
}

#[test]
fn test_keybinding_change_patches_only_named_action() {
    let mut resolver = builtin_resolver();
    let count = resolver.registry().len();
    let widgets = resolver.menu_bar().widget_ids();
    let before: Vec<_> = resolver
        .registry()
        .ids()
        .into_iter()
        .map(|id| (id.clone(), resolver.lookup(&id).unwrap()))
        .collect();

    resolver.on_config_change(&ConfigChangeEvent::KeybindingChanged(
        KeybindingChange::new().bind("edit.select-all", "C-M-a"),
    ));

    assert_eq!(resolver.registry().len(), count);
    assert_eq!(resolver.menu_bar().widget_ids(), widgets);
    for (id, action) in before {
        let current = resolver.lookup(&id).unwrap();
        assert!(Rc::ptr_eq(&action, &current));
        if id != "edit.select-all" {
            assert_eq!(current.accelerator(), action.accelerator());
        }
    }
    assert_eq!(
        resolver.lookup("edit.select-all").unwrap().accelerator(),
        Some(Accelerator::parse("C-M-a").unwrap())
    );
    assert_eq!(
        resolver
            .menu_bar()
            .find("edit.select-all")
            .unwrap()
            .accelerator()
            .map(|accelerator| accelerator.to_string()),
        Some("C-M-a".to_string())
    );
}

#[test]
fn test_tool_and_doc_type_changes_rebuild_everything() {
    let mut resolver = builtin_resolver();
    let registry_before = resolver.registry().ids();

    for event in [
        ConfigChangeEvent::ProvidedToolChanged {
            tools: vec![ToolSpec::new("tools.provided.build", "Build", "cargo build").with_accelerator("F5")],
        },
        ConfigChangeEvent::DocTypeChanged {
            doc_types: vec![DocTypeSpec::new("doc.plain", "Plain Text"), DocTypeSpec::new("doc.rust", "Rust")],
            active: None,
        },
    ] {
        let widgets_before = resolver.menu_bar().widget_ids();
        let rebuilds = resolver.rebuild_count();

        resolver.on_config_change(&event);

        assert_eq!(resolver.rebuild_count(), rebuilds + 1);
        let widgets_after = resolver.menu_bar().widget_ids();
        assert_eq!(widgets_after.len(), widgets_before.len());
        assert!(widgets_after.iter().all(|id| !widgets_before.contains(id)));
        assert_eq!(resolver.registry().ids(), registry_before);
    }
}

#[test]
fn test_rebuild_keeps_patched_accelerators() {
    let mut resolver = builtin_resolver();
    resolver.on_config_change(&ConfigChangeEvent::KeybindingChanged(
        KeybindingChange::new()
            .bind("doc.rust", "C-r")
            .bind("doc.plain", "C-p")
            .bind("tools.provided.build", "C-b"),
    ));

    resolver.on_config_change(&ConfigChangeEvent::DocTypeChanged {
        doc_types: vec![DocTypeSpec::new("doc.plain", "Plain Text"), DocTypeSpec::new("doc.rust", "Rust")],
        active: None,
    });
    // ノード側の F5 より後から設定した割り当てが優先される
    resolver.on_config_change(&ConfigChangeEvent::ProvidedToolChanged {
        tools: vec![ToolSpec::new("tools.provided.build", "Build", "cargo build").with_accelerator("F5")],
    });

    for (id, text) in [("doc.rust", "C-r"), ("doc.plain", "C-p"), ("tools.provided.build", "C-b")] {
        assert_eq!(
            resolver.lookup(id).unwrap().accelerator(),
            Some(Accelerator::parse(text).unwrap()),
            "{id}"
        );
    }
    let rust = resolver
        .find_by_accelerator(&Accelerator::parse("C-r").unwrap())
        .unwrap();
    assert_eq!(rust.id(), "doc.rust");
}

#[test]
fn test_custom_tools_appear_and_disappear() {
    let mut resolver = builtin_resolver();
    resolver.on_config_change(&ConfigChangeEvent::CustomToolChanged {
        tools: vec![
            ToolSpec::new("tools.custom.fmt", "Format", "rustfmt").with_accelerator("C-S-f"),
            ToolSpec::new("tools.custom.lint", "Lint", "cargo clippy"),
        ],
    });

    let tools = resolver.menu_bar().find("tools.custom").unwrap();
    assert_eq!(tools.children().len(), 2);
    let fmt = resolver
        .find_by_accelerator(&Accelerator::parse("C-S-f").unwrap())
        .unwrap();
    assert_eq!(fmt.id(), "tools.custom.fmt");

    resolver.on_config_change(&ConfigChangeEvent::CustomToolChanged { tools: Vec::new() });
    assert!(resolver.lookup("tools.custom.fmt").is_none());
    assert!(resolver.menu_bar().find("tools.custom.lint").is_none());
}

#[test]
fn test_popup_is_independent_working_copy() {
    let mut resolver = builtin_resolver();
    let mut working = resolver.popup_tree(PopupKind::Tab);
    working.children.clear();
    assert!(resolver.tree().find("file.close").is_some());

    let popup = resolver.popup(PopupKind::Tab);
    let ids: Vec<&str> = popup.items().iter().map(|item| item.node_id()).collect();
    assert_eq!(
        ids,
        vec!["file.close", "popup.tab.separator.1", "view.next-document", "view.previous-document"]
    );
    // ポップアップ項目はメニューバーと同じアクションを指す
    let action = popup.find("file.close").unwrap().action().unwrap().clone();
    assert!(Rc::ptr_eq(&action, &resolver.lookup("file.close").unwrap()));
}

#[test]
fn test_radio_groups_from_parent_menu() {
    let mut resolver = MenuResolver::new(mixed_tree())
        .unwrap()
        .with_factories(plugin_factories());
    resolver.build_all();
    resolver.load_menu_bar();

    let group = resolver.selection_group("mode").unwrap();
    assert_eq!(group.member_ids(), vec!["mode.insert".to_string(), "mode.overwrite".to_string()]);

    assert!(resolver.select("mode.overwrite"));
    assert!(resolver.select("mode.insert"));
    assert_eq!(group.selected().as_deref(), Some("mode.insert"));
    assert!(!resolver.lookup("mode.overwrite").unwrap().is_selected());
}
