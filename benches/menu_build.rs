use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use scribe::buffer::TextBuffer;
use scribe::editor::EditCoalescer;
use scribe::menu::{KeybindingChange, MenuNode, MenuResolver, NodeKind, TargetKind};

/// メニュー数 × 項目数 の大きなツリー
fn large_tree(menus: usize, items: usize) -> MenuNode {
    let mut root = MenuNode::root();
    for m in 0..menus {
        let mut menu = MenuNode::new(format!("menu{}", m), NodeKind::Menu);
        for i in 0..items {
            let id = format!("menu{}.item{}", m, i);
            let node = match i % 4 {
                0 => MenuNode::new(id, NodeKind::Item).with_target(TargetKind::Builtin, "new-document"),
                1 => MenuNode::new(id, NodeKind::CheckBox),
                2 => MenuNode::new(id, NodeKind::Radio),
                _ => MenuNode::separator(id),
            };
            menu = menu.with_child(node);
        }
        root = root.with_child(menu);
    }
    root
}

/// アクション構築とメニューバー組み立て
fn bench_menu_build(c: &mut Criterion) {
    let tree = large_tree(20, 50);
    let mut group = c.benchmark_group("menu_resolver");

    group.bench_function("build_all_and_load", |b| {
        b.iter_batched(
            || MenuResolver::new(tree.clone()).unwrap(),
            |mut resolver| {
                resolver.build_all();
                resolver.load_menu_bar();
                black_box(resolver.menu_bar().widget_ids().len())
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("keybinding_patch", |b| {
        let mut resolver = MenuResolver::new(tree.clone()).unwrap();
        resolver.build_all();
        resolver.load_menu_bar();
        let mut change = KeybindingChange::new();
        for m in 0..20 {
            change = change.bind(format!("menu{}.item0", m), format!("C-F{}", m % 12 + 1));
        }
        b.iter(|| black_box(resolver.patch_keybindings(&change)))
    });

    group.finish();
}

/// 1文字ずつの入力（まとめ込みあり）
fn bench_coalesced_typing(c: &mut Criterion) {
    let mut group = c.benchmark_group("edit_history");
    group.bench_function("type_1000_chars", |b| {
        b.iter_batched(
            || {
                let mut buffer = TextBuffer::new();
                let history = EditCoalescer::new();
                history.attach(&mut buffer);
                (buffer, history)
            },
            |(mut buffer, history)| {
                for _ in 0..1000 {
                    let caret = buffer.caret();
                    let _ = buffer.insert(caret, black_box("a"));
                    buffer.flush_deferred();
                }
                black_box(history.status().undo_units)
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_menu_build, bench_coalesced_typing);
criterion_main!(benches);
