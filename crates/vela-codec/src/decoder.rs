//! 解码器 trait 定义.

use vela_core::VelaResult;

use crate::frame::DecodedPicture;
use crate::packet::Packet;

/// 解码器 trait
///
/// 解码流程:
/// 1. 调用 `send_packet()` 送入一个 NAL 单元
/// 2. 调用 `receive_frame()` 取出解码后的图像, 直到返回 `NeedMoreData`
/// 3. 码流结束时送入空包, 再取出所有剩余图像直到返回 `Eof`
pub trait Decoder: Send {
    /// 获取解码器名称
    fn name(&self) -> &str;

    /// 送入一个数据包
    ///
    /// 送入空包表示码流结束, 解码器刷新尾部图像.
    /// 被忽略的单元 (保留扩展, 缺少段头等) 不视为错误.
    fn send_packet(&mut self, packet: &Packet) -> VelaResult<()>;

    /// 取出一幅解码图像
    ///
    /// # 返回
    /// - `Ok(picture)`: 成功取出一幅图像
    /// - `Err(VelaError::NeedMoreData)`: 需要送入更多数据包
    /// - `Err(VelaError::Eof)`: 刷新后所有图像已取出
    fn receive_frame(&mut self) -> VelaResult<DecodedPicture>;

    /// 重置解码器, 清空内部状态
    fn flush(&mut self);
}
