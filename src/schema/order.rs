//! 展示顺序
//!
//! 按 `order` 稳定排序：缺失 order 的排在最后，相同 order 保持原数组中的相对位置。

use std::cmp::Ordering;

use super::section::Section;

fn compare(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// 按展示顺序返回原数组下标
pub fn display_order(sections: &[Section]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..sections.len()).collect();
    // sort_by 是稳定排序
    indices.sort_by(|&a, &b| compare(sections[a].order(), sections[b].order()));
    indices
}

pub fn sort_by_order(sections: &mut [Section]) {
    sections.sort_by(|a, b| compare(a.order(), b.order()));
}

/// 保存前归一化：按展示顺序把 order 改写为 0..n，数组本身不移动
pub fn normalize_orders(sections: &mut [Section]) {
    for (position, index) in display_order(sections).into_iter().enumerate() {
        sections[index].set_order(position as i64);
    }
}

/// order 是否恰好是 0..n 的一个排列
pub fn is_dense(sections: &[Section]) -> bool {
    let mut orders: Vec<Option<i64>> = sections.iter().map(Section::order).collect();
    orders.sort();
    orders
        .iter()
        .enumerate()
        .all(|(position, order)| *order == Some(position as i64))
}
