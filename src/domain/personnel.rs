// ==========================================
// 店铺营收分级引擎 - 人员与店铺
// ==========================================
// 职责: Employee（含上级引用）/ Shop（含负责人）
// 红线: manager_id 只是查找键，不表达所有权
// ==========================================

use crate::domain::types::ShopStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// Employee - 人员
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub manager_id: Option<String>, // 上级（Leader）ID
}

// ==========================================
// Shop - 店铺
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub shop_id: String,
    pub shop_name: String,
    pub status: Option<ShopStatus>,
    pub personnel_id: Option<String>, // 负责人员 ID
}

// ==========================================
// EmployeeDirectory - 人员索引
// ==========================================
// 用途: 按 ID 查人员 / 查上级，供统计汇总分组
#[derive(Debug, Clone, Default)]
pub struct EmployeeDirectory {
    by_id: HashMap<String, Employee>,
}

impl EmployeeDirectory {
    pub fn new(employees: impl IntoIterator<Item = Employee>) -> Self {
        Self {
            by_id: employees.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Employee> {
        self.by_id.get(id)
    }

    /// 查找人员的上级
    ///
    /// 上级 ID 指向不存在的人员时返回 None
    pub fn manager_of(&self, personnel_id: &str) -> Option<&Employee> {
        self.get(personnel_id)
            .and_then(|e| e.manager_id.as_deref())
            .and_then(|manager_id| self.get(manager_id))
    }

    /// 上级 ID（不要求上级本人在索引中）
    pub fn manager_id_of(&self, personnel_id: &str) -> Option<&str> {
        self.get(personnel_id).and_then(|e| e.manager_id.as_deref())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
