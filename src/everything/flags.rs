use std::ops::{BitOr, BitOrAssign};

/// Everything_SetRequestFlags 的位掩码 (EVERYTHING_REQUEST_*)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestFlags(u32);

impl RequestFlags {
    pub const FILE_NAME: Self = Self(0x0000_0001);
    pub const PATH: Self = Self(0x0000_0002);
    pub const FULL_PATH_AND_FILE_NAME: Self = Self(0x0000_0004);
    pub const EXTENSION: Self = Self(0x0000_0008);
    pub const SIZE: Self = Self(0x0000_0010);
    pub const DATE_CREATED: Self = Self(0x0000_0020);
    pub const DATE_MODIFIED: Self = Self(0x0000_0040);
    pub const DATE_ACCESSED: Self = Self(0x0000_0080);
    pub const ATTRIBUTES: Self = Self(0x0000_0100);
    pub const RUN_COUNT: Self = Self(0x0000_0400);
    pub const HIGHLIGHTED_FILE_NAME: Self = Self(0x0000_2000);
    pub const HIGHLIGHTED_PATH: Self = Self(0x0000_4000);

    /// 默认请求：路径、文件名与全部常规元数据，不含运行次数和高亮
    pub const DEFAULT: Self = Self(
        Self::FILE_NAME.0
            | Self::PATH.0
            | Self::EXTENSION.0
            | Self::SIZE.0
            | Self::DATE_CREATED.0
            | Self::DATE_MODIFIED.0
            | Self::DATE_ACCESSED.0
            | Self::ATTRIBUTES.0,
    );

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// 字段名 -> 标志位，路径总会被读取，所以 path 相关名称都映射到 PATH
    pub fn from_field_name(name: &str) -> Option<Self> {
        let flag = match name.trim().to_lowercase().as_str() {
            "filename" | "file_name" | "name" => Self::FILE_NAME,
            "path" | "full_path" => Self::PATH,
            "extension" | "ext" => Self::EXTENSION,
            "size" => Self::SIZE,
            "created" | "date_created" => Self::DATE_CREATED,
            "modified" | "date_modified" => Self::DATE_MODIFIED,
            "accessed" | "date_accessed" => Self::DATE_ACCESSED,
            "attributes" => Self::ATTRIBUTES,
            "run_count" => Self::RUN_COUNT,
            "highlighted_filename" | "highlighted_file_name" => Self::HIGHLIGHTED_FILE_NAME,
            "highlighted_path" => Self::HIGHLIGHTED_PATH,
            _ => return None,
        };
        Some(flag)
    }

    /// 实际提交给 SDK 的掩码：无论调用方要什么，完整路径都必须取到
    pub fn with_path(self) -> Self {
        if self.contains(Self::FULL_PATH_AND_FILE_NAME) || self.contains(Self::PATH | Self::FILE_NAME) {
            self
        } else {
            self | Self::PATH | Self::FILE_NAME
        }
    }
}

impl Default for RequestFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for RequestFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RequestFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
