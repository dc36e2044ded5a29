//! `key=value` 选项串解析.
//!
//! 选项串由 `:` 分隔的若干 token 组成:
//! - `name=value` 为命名选项;
//! - 不含 `=` 的裸 token 为位置选项, 按识别名列表的顺序依次对应;
//! - token 末尾的反斜杠表示续接, 下一个 token 连同分隔符一起拼接到当前值,
//!   从而允许值中出现分隔符, 例如 `a=1\:2` 的值为 `1:2`.
//!
//! 出现过命名选项后的位置选项、超出识别名数量的位置选项、以及未识别的选项名
//! 都只产生警告, 该 token 被丢弃, 解析继续进行.

use log::warn;

/// 选项串中 token 之间的分隔符
pub const OPTION_SEPARATOR: &str = ":";

/// 解析过程中产生的非致命警告
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionWarning {
    /// 位置选项数量超过识别名数量
    TooManyOptions(String),
    /// 未识别的选项名
    UnknownOption(String),
    /// 命名选项之后出现了位置选项
    PositionalAfterNamed(String),
}

/// 按分隔符切分字符串
///
/// - 以反斜杠结尾的片段与下一个片段合并 (去掉反斜杠, 保留分隔符);
/// - `limit > 0` 时最多产生 `limit` 个片段, 其余内容原样并入最后一个片段;
/// - 空串返回空列表.
pub fn split_string(input: &str, sep: &str, limit: usize) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }
    if sep.is_empty() || !input.contains(sep) {
        return vec![input.to_string()];
    }

    let mut split: Vec<String> = Vec::new();
    for tok in input.split(sep) {
        let over_limit = limit > 0 && split.len() >= limit;
        let escaped = !over_limit && split.last().is_some_and(|prev| prev.ends_with('\\'));
        match split.last_mut() {
            Some(prev) if over_limit || escaped => {
                if escaped {
                    prev.pop();
                }
                prev.push_str(sep);
                prev.push_str(tok);
            }
            _ => split.push(tok.to_string()),
        }
    }
    split
}

/// 解析后的有序选项表
///
/// 同名选项可以出现多次, 查询时以最后一次出现为准.
#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    /// (名称, 值) 列表, 保持出现顺序
    pairs: Vec<(String, String)>,
    /// 解析警告
    warnings: Vec<OptionWarning>,
}

impl SplitOptions {
    /// 解析选项串
    ///
    /// # 参数
    /// - `opt_str`: 原始选项串
    /// - `names`: 识别的选项名, 顺序即位置选项的对应顺序
    pub fn parse(opt_str: &str, names: &[&str]) -> Self {
        let mut opts = Self::default();
        let mut found_named = false;

        for (i, token) in split_string(opt_str, OPTION_SEPARATOR, 0)
            .into_iter()
            .enumerate()
        {
            let mut arg = split_string(&token, "=", 2);
            if arg.len() == 2 {
                found_named = true;
                let value = arg.pop().unwrap_or_default();
                let name = arg.pop().unwrap_or_default();
                if names.contains(&name.as_str()) {
                    opts.pairs.push((name, value));
                } else {
                    warn!("选项警告: 无效选项 '{name}'");
                    opts.warnings.push(OptionWarning::UnknownOption(name));
                }
                continue;
            }

            if found_named {
                warn!("选项警告: 命名选项之后出现位置选项 '{token}', 已忽略");
                opts.warnings
                    .push(OptionWarning::PositionalAfterNamed(token));
                continue;
            }

            match names.get(i) {
                Some(name) => {
                    let value = arg.pop().unwrap_or_default();
                    opts.pairs.push((name.to_string(), value));
                }
                None => {
                    warn!("选项警告: 给出的选项过多, 忽略 '{token}'");
                    opts.warnings.push(OptionWarning::TooManyOptions(token));
                }
            }
        }

        opts
    }

    /// 按名称查询选项值 (最后一次出现为准)
    ///
    /// 值为空串或选项未出现时均返回 `None`, 调用方据此使用默认值.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.raw(name).filter(|v| !v.is_empty())
    }

    /// 按名称查询存储的原始值, 空串也会返回
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// 布尔型选项: `1`/`true`/`yes`/`on` 为真, 其他值为假, 缺省时返回 `default`
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.get(name) {
            Some(v) => {
                v == "1"
                    || v.eq_ignore_ascii_case("true")
                    || v.eq_ignore_ascii_case("yes")
                    || v.eq_ignore_ascii_case("on")
            }
            None => default,
        }
    }

    /// 浮点型选项, 无法解析时记录警告并返回 `default`
    pub fn get_f64(&self, name: &str, default: f64) -> f64 {
        match self.get(name) {
            Some(v) => match v.trim().parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => parsed,
                _ => {
                    warn!("选项警告: '{name}' 的值 '{v}' 不是有效数字, 使用默认值 {default}");
                    default
                }
            },
            None => default,
        }
    }

    /// 整数型选项: 按浮点解析后截断
    pub fn get_i32(&self, name: &str, default: i32) -> i32 {
        self.get_f64(name, f64::from(default)) as i32
    }

    /// 全部 (名称, 值) 对, 按出现顺序
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// 解析过程中产生的警告
    pub fn warnings(&self) -> &[OptionWarning] {
        &self.warnings
    }
}
