pub mod buffer;
pub mod image;
pub mod sampler;

slotmap::new_key_type! {
    /// 指向 [`crate::foundation::mem_allocator::GfxMemAllocator`] 中登记的一块 GPU 内存
    ///
    /// buffer 和 image 只持有 handle，内存本身由 allocator 统一持有和释放
    pub struct AllocationHandle;
}
