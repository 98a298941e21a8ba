pub mod cds_data;

// 重新匯出常用模型類型
pub use cds_data::*;
