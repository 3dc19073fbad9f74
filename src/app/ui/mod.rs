mod controls;
mod panels;

pub(super) use controls::AttributeTable;
