// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

#![allow(dead_code)]

use shop_revenue_engine::domain::personnel::{Employee, Shop};
use shop_revenue_engine::domain::types::ShopStatus;

// ==========================================
// Shop 构建器
// ==========================================

pub struct ShopBuilder {
    shop_id: String,
    shop_name: String,
    status: Option<ShopStatus>,
    personnel_id: Option<String>,
}

impl ShopBuilder {
    pub fn new(shop_id: &str) -> Self {
        Self {
            shop_id: shop_id.to_string(),
            shop_name: format!("Shop {}", shop_id),
            status: Some(ShopStatus::Operating),
            personnel_id: None,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.shop_name = name.to_string();
        self
    }

    pub fn status(mut self, status: Option<ShopStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn personnel(mut self, personnel_id: &str) -> Self {
        self.personnel_id = Some(personnel_id.to_string());
        self
    }

    pub fn build(self) -> Shop {
        Shop {
            shop_id: self.shop_id,
            shop_name: self.shop_name,
            status: self.status,
            personnel_id: self.personnel_id,
        }
    }
}

// ==========================================
// Employee 构建器
// ==========================================

pub struct EmployeeBuilder {
    id: String,
    name: String,
    manager_id: Option<String>,
}

impl EmployeeBuilder {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            manager_id: None,
        }
    }

    pub fn manager(mut self, manager_id: &str) -> Self {
        self.manager_id = Some(manager_id.to_string());
        self
    }

    pub fn build(self) -> Employee {
        Employee {
            id: self.id,
            name: self.name,
            manager_id: self.manager_id,
        }
    }
}

// ==========================================
// 综合报表 CSV 构建器
// ==========================================
// 列使用平台导出的越南语标签

pub const HEADER: [&str; 6] = [
    "Mã Shop",
    "Ngày",
    "Tổng giá trị hàng hóa (₫)",
    "Doanh số đơn hủy (₫)",
    "Doanh số đơn hoàn trả (₫)",
    "Tổng số đơn hàng",
];

pub struct ReportCsvBuilder {
    rows: Vec<[String; 6]>,
}

impl ReportCsvBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// 追加一行（金额为原始单元格文本）
    pub fn row(mut self, shop_id: &str, date: &str, total: &str, cancelled: &str, returned: &str, orders: &str) -> Self {
        self.rows.push([
            shop_id.to_string(),
            date.to_string(),
            total.to_string(),
            cancelled.to_string(),
            returned.to_string(),
            orders.to_string(),
        ]);
        self
    }

    pub fn blank_row(mut self) -> Self {
        self.rows.push(Default::default());
        self
    }

    pub fn build(self) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(HEADER).unwrap();
        for row in &self.rows {
            writer.write_record(row).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }
}
